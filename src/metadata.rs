use std::collections::BTreeMap;

use crate::models::{DecodeTier, DicomAttributes};
use crate::overlay::OverlayLabel;

/// Flat string-keyed view of a decode, for display panels and for whatever stores the render.
pub type MetadataMap = BTreeMap<String, String>;

fn insert(map: &mut MetadataMap, label: &str, value: impl ToString) {
    map.insert(label.to_string(), value.to_string());
}

pub fn metadata_map(attrs: &DicomAttributes, tier: DecodeTier, label: &OverlayLabel) -> MetadataMap {
    let mut map = MetadataMap::new();

    insert(&mut map, "fileName", &label.file_name);
    insert(&mut map, "fileSize", label.size_bytes);
    insert(&mut map, "decodeTier", tier);

    insert(&mut map, "patientName", &attrs.patient_name_raw);
    insert(&mut map, "studyDate", &attrs.study_date);
    insert(&mut map, "modality", &attrs.modality);

    insert(&mut map, "width", attrs.width);
    insert(&mut map, "height", attrs.height);
    insert(&mut map, "bitsAllocated", attrs.bits_allocated);
    insert(&mut map, "pixelRepresentation", attrs.pixel_representation);
    insert(&mut map, "rescaleSlope", attrs.rescale_slope);
    insert(&mut map, "rescaleIntercept", attrs.rescale_intercept);
    insert(&mut map, "windowCenter", attrs.window_center);
    insert(&mut map, "windowWidth", attrs.window_width);

    map
}

pub fn print_info(attrs: &DicomAttributes, tier: DecodeTier, label: &OverlayLabel) {
    println!("{}", "=".repeat(80));
    println!("DICOM File Information: {}", label.caption());
    println!("{}", "=".repeat(80));

    println!("PATIENT");
    println!(
        "  Name: {}",
        attrs.display_patient_name().as_deref().unwrap_or("N/A")
    );

    println!("\nSTUDY");
    println!("  Date: {}", attrs.study_date);
    println!("  Modality: {}", attrs.modality);

    println!("\nIMAGE");
    println!("  Size: {}x{}", attrs.width, attrs.height);
    println!(
        "  Bits Allocated: {} ({})",
        attrs.bits_allocated, attrs.pixel_representation
    );
    println!(
        "  Rescale: slope {} / intercept {}",
        attrs.rescale_slope, attrs.rescale_intercept
    );
    println!(
        "  Window: center {} / width {}",
        attrs.window_center, attrs.window_width
    );
    println!("  Decoded by: {}", tier);
}

use std::borrow::Cow;

use dicom::core::Tag;
use dicom::object::DefaultDicomObject;

/// Small helper trait to pull typed values out of a parsed DICOM object without caring why a read failed.
pub trait ElementAccess {
    fn element_str(&self, tag: Tag) -> Option<String>;
    fn element_u16(&self, tag: Tag) -> Option<u16>;
    fn element_bytes(&self, tag: Tag) -> Option<Cow<'_, [u8]>>;
    fn has_element(&self, tag: Tag) -> bool;
}

impl ElementAccess for DefaultDicomObject {
    fn element_str(&self, tag: Tag) -> Option<String> {
        self.element(tag)
            .ok()
            .and_then(|e| e.to_str().ok())
            .map(|s| s.into_owned())
    }

    fn element_u16(&self, tag: Tag) -> Option<u16> {
        self.element(tag).ok().and_then(|e| e.to_int::<u16>().ok())
    }

    fn element_bytes(&self, tag: Tag) -> Option<Cow<'_, [u8]>> {
        self.element(tag).ok().and_then(|e| e.to_bytes().ok())
    }

    fn has_element(&self, tag: Tag) -> bool {
        self.element(tag).is_ok()
    }
}

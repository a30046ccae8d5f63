use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::warn;
use walkdir::WalkDir;

use crate::decoder::DicomDecoder;
use crate::overlay::{self, OverlayLabel};
use crate::renderer::{ImageRenderer, RenderOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub converted: usize,
    pub failed: usize,
}

/// Render every `.dcm` file below `dir` to JPEG. Files land next to their source, or mirror the
/// directory layout under `output` when one is given.
pub fn process_directory(
    dir: &Path,
    output: Option<&Path>,
    options: &RenderOptions,
) -> Result<BatchSummary> {
    println!("Processando diretório: {:?}", dir);

    let files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("dcm")))
        .collect();

    println!("Encontrados {} arquivos.", files.len());

    let decoder = DicomDecoder::default();
    let renderer = ImageRenderer::default();
    let converted = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    files.par_iter().for_each(|path| {
        let target = target_path(dir, path, output);
        match convert_file(&decoder, &renderer, path, &target, options) {
            Ok(()) => {
                converted.fetch_add(1, Ordering::Relaxed);
                println!("Sucesso: {:?} -> {:?}", path, target);
            }
            Err(e) => {
                failed.fetch_add(1, Ordering::Relaxed);
                warn!(path = %path.display(), error = %e, "batch conversion failed");
                eprintln!("Erro em {:?}: {:#}", path, e);
            }
        }
    });

    let summary = BatchSummary {
        converted: converted.into_inner(),
        failed: failed.into_inner(),
    };
    println!(
        "Concluído: {} convertidos, {} com erro.",
        summary.converted, summary.failed
    );
    Ok(summary)
}

fn target_path(root: &Path, source: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        Some(out) => {
            let relative = source.strip_prefix(root).unwrap_or(source);
            out.join(relative).with_extension("jpg")
        }
        None => source.with_extension("jpg"),
    }
}

fn convert_file(
    decoder: &DicomDecoder,
    renderer: &ImageRenderer,
    source: &Path,
    target: &Path,
    options: &RenderOptions,
) -> Result<()> {
    let bytes = fs::read(source).with_context(|| format!("Failed to read {:?}", source))?;
    let label = OverlayLabel::new(overlay::display_name(source), bytes.len() as u64);
    let decoded = decoder.parse(&bytes);
    let rendered = renderer.render(&decoded, &label, options)?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {:?}", parent))?;
    }
    fs::write(target, &rendered.bytes)
        .with_context(|| format!("Failed to save image to {:?}", target))?;
    Ok(())
}

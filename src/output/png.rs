//! Rasterizing page SVGs with resvg.

use std::path::Path;

use resvg::usvg;
use tiny_skia::{Pixmap, Transform};

use crate::error::{Error, Result};

pub fn svg_to_png(svg: &str, scale: f32) -> Result<Vec<u8>> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(Error::InvalidInput(format!("Invalid PNG scale: {}", scale)));
    }

    let mut opts = usvg::Options::default();
    {
        let fontdb = opts.fontdb_mut();
        fontdb.load_system_fonts();

        let local_fonts = Path::new("fonts");
        if local_fonts.is_dir() {
            fontdb.load_fonts_dir(local_fonts);
        }

        configure_font_fallbacks(fontdb);
    }

    let tree = usvg::Tree::from_str(svg, &opts)
        .map_err(|e| Error::Output(format!("Failed to parse SVG: {}", e)))?;

    let width = (tree.size().width() * scale).ceil() as u32;
    let height = (tree.size().height() * scale).ceil() as u32;

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| Error::Output(format!("Failed to create a {}x{} pixmap", width, height)))?;
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| Error::Output(format!("Failed to encode PNG: {}", e)))
}

/// Point the generic families the page SVGs ask for at installed fonts.
fn configure_font_fallbacks(fontdb: &mut usvg::fontdb::Database) {
    let families: Vec<String> = fontdb
        .faces()
        .flat_map(|face| face.families.iter().map(|(family, _)| family.clone()))
        .collect();

    let find = |accept: &dyn Fn(&str) -> bool| {
        families
            .iter()
            .find(|family| accept(&family.to_ascii_lowercase()))
            .cloned()
    };
    let first = families.first().cloned();
    let sans = find(&|f| f.contains("sans")).or_else(|| first.clone());
    let serif = find(&|f| f.contains("serif") && !f.contains("sans")).or_else(|| first.clone());
    let mono = find(&|f| f.contains("mono") || f.contains("courier")).or_else(|| sans.clone());

    if let Some(family) = sans {
        fontdb.set_sans_serif_family(family);
    }
    if let Some(family) = serif {
        fontdb.set_serif_family(family);
    }
    if let Some(family) = mono {
        fontdb.set_monospace_family(family);
    }
}

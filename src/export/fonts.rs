use std::fs;
use std::path::Path;

use genpdf::fonts::{self, FontData, FontFamily};
use tracing::{debug, warn};

use crate::config::ExportConfig;
use crate::error::{Error, Result};

/// A font family installed under a fixed directory, as
/// `[regular, bold, italic, bold_italic]` file names.
struct SystemFont {
    dir: &'static str,
    files: [&'static str; 4],
}

const LIBERATION: [&str; 4] = [
    "LiberationSans-Regular.ttf",
    "LiberationSans-Bold.ttf",
    "LiberationSans-Italic.ttf",
    "LiberationSans-BoldItalic.ttf",
];

const DEJAVU: [&str; 4] = [
    "DejaVuSans.ttf",
    "DejaVuSans-Bold.ttf",
    "DejaVuSans-Oblique.ttf",
    "DejaVuSans-BoldOblique.ttf",
];

const SYSTEM_FONTS: &[SystemFont] = &[
    SystemFont {
        dir: "/usr/share/fonts/truetype/liberation",
        files: LIBERATION,
    },
    SystemFont {
        dir: "/usr/share/fonts/liberation-sans",
        files: LIBERATION,
    },
    SystemFont {
        dir: "/usr/share/fonts/truetype/dejavu",
        files: DEJAVU,
    },
    SystemFont {
        dir: "/usr/share/fonts/dejavu-sans-fonts",
        files: DEJAVU,
    },
    SystemFont {
        dir: "/usr/share/fonts/TTF",
        files: DEJAVU,
    },
    SystemFont {
        dir: "/System/Library/Fonts/Supplemental",
        files: [
            "Arial.ttf",
            "Arial Bold.ttf",
            "Arial Italic.ttf",
            "Arial Bold Italic.ttf",
        ],
    },
    SystemFont {
        dir: "C:\\Windows\\Fonts",
        files: ["arial.ttf", "arialbd.ttf", "ariali.ttf", "arialbi.ttf"],
    },
];

/// Font family for the printable export.
///
/// `export.font_dir` wins when set and must hold
/// `{font_family}-Regular.ttf` and friends. Otherwise the first complete
/// family found in the usual system locations is used.
pub fn load_fonts(config: &ExportConfig) -> Result<FontFamily<FontData>> {
    if let Some(dir) = &config.font_dir {
        return fonts::from_files(dir, &config.font_family, None).map_err(|e| {
            Error::Config(format!(
                "could not load font family {} from {}: {e}",
                config.font_family,
                dir.display()
            ))
        });
    }

    for font in SYSTEM_FONTS {
        let dir = Path::new(font.dir);
        if !font.files.iter().all(|f| dir.join(f).is_file()) {
            continue;
        }
        match load_family(dir, &font.files) {
            Ok(family) => {
                debug!(dir = font.dir, regular = font.files[0], "loaded export font");
                return Ok(family);
            }
            Err(e) => warn!(dir = font.dir, error = %e, "skipping unreadable font family"),
        }
    }

    Err(Error::Config(
        "no usable TrueType font found, set export.font_dir and export.font_family".into(),
    ))
}

fn load_family(dir: &Path, files: &[&str; 4]) -> Result<FontFamily<FontData>> {
    let load = |name: &str| -> Result<FontData> {
        let data = fs::read(dir.join(name))?;
        Ok(FontData::new(data, None)?)
    };
    Ok(FontFamily {
        regular: load(files[0])?,
        bold: load(files[1])?,
        italic: load(files[2])?,
        bold_italic: load(files[3])?,
    })
}

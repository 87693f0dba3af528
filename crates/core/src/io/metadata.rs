//! GDAL metadata TIFF tag (42112): per-band descriptions
//!
//! The tag holds a small XML document:
//! ```text
//! <GDALMetadata>
//!   <Item name="DESCRIPTION" sample="0" role="description">Red</Item>
//! </GDALMetadata>
//! ```

use crate::error::{Error, Result};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

/// TIFF tag number of the GDAL metadata document
pub const GDAL_METADATA_TAG: u16 = 42112;

/// Extract band descriptions (0-based `sample`) from a GDAL metadata document.
///
/// The returned vector always has `band_count` entries; bands without a
/// description are `None`.
pub fn parse_descriptions(xml: &str, band_count: usize) -> Result<Vec<Option<String>>> {
    let mut descriptions = vec![None; band_count];
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut current: Option<usize> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"Item" => {
                let mut is_description = false;
                let mut sample = None;
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value);
                    match attr.key.as_ref() {
                        b"role" => is_description = value == "description",
                        b"name" if value == "DESCRIPTION" => is_description = true,
                        b"sample" => sample = value.parse::<usize>().ok(),
                        _ => {}
                    }
                }
                current = sample.filter(|_| is_description);
            }
            Ok(Event::Text(t)) => {
                if let Some(index) = current {
                    let text = t
                        .unescape()
                        .map_err(|e| Error::Metadata(e.to_string()))?;
                    if let Some(slot) = descriptions.get_mut(index) {
                        *slot = Some(text.into_owned());
                    }
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Metadata(format!(
                    "GDAL metadata XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(descriptions)
}

/// Render band descriptions as a GDAL metadata document.
///
/// Returns `None` when no band carries a non-empty description.
pub fn render_descriptions(descriptions: &[Option<String>]) -> Option<String> {
    let items: Vec<String> = descriptions
        .iter()
        .enumerate()
        .filter_map(|(sample, desc)| {
            let desc = desc.as_deref()?.trim();
            if desc.is_empty() {
                return None;
            }
            Some(format!(
                "  <Item name=\"DESCRIPTION\" sample=\"{}\" role=\"description\">{}</Item>\n",
                sample,
                escape(desc)
            ))
        })
        .collect();

    if items.is_empty() {
        return None;
    }
    Some(format!("<GDALMetadata>\n{}</GDALMetadata>", items.concat()))
}

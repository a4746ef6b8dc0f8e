use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use std::path::Path;

/// Text of the first element named `local_name` (namespace prefix ignored) at any depth.
/// - Entity and character references are resolved; surrounding whitespace is trimmed.
/// - Returns Ok(None) when no such element exists.
pub(crate) fn first_element_text(xml: &str, local_name: &str) -> Result<Option<String>, String> {
    let mut reader = Reader::from_str(xml);

    let mut depth_in_target: usize = 0;
    let mut text = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if depth_in_target > 0 {
                    depth_in_target += 1;
                } else if e.local_name().as_ref() == local_name.as_bytes() {
                    depth_in_target = 1;
                }
            }
            Ok(Event::Empty(e)) => {
                if depth_in_target == 0 && e.local_name().as_ref() == local_name.as_bytes() {
                    return Ok(Some(String::new()));
                }
            }
            Ok(Event::End(_)) => {
                if depth_in_target == 1 {
                    return Ok(Some(text.trim().to_string()));
                }
                depth_in_target = depth_in_target.saturating_sub(1);
            }
            Ok(Event::Text(t)) if depth_in_target > 0 => {
                let decoded = t.decode().map_err(|e| e.to_string())?;
                text.push_str(&decoded);
            }
            Ok(Event::CData(t)) if depth_in_target > 0 => {
                text.push_str(&String::from_utf8_lossy(&t));
            }
            Ok(Event::GeneralRef(r)) if depth_in_target > 0 => {
                if let Some(ch) = r.resolve_char_ref().map_err(|e| e.to_string())? {
                    text.push(ch);
                } else {
                    let name = r.decode().map_err(|e| e.to_string())?;
                    let resolved = resolve_predefined_entity(&name)
                        .ok_or_else(|| format!("unknown entity '&{name};'"))?;
                    text.push_str(resolved);
                }
            }
            Ok(Event::Eof) => return Ok(None),
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "XML error at position {}: {e}",
                    reader.error_position()
                ));
            }
        }
    }
}

/// Map a server-side file path onto the owner-relative path the share API expects.
/// - `<data_root>/<owner>/files/<rest>` becomes `/<rest>`.
/// - Anything else is returned unchanged (with a leading '/').
pub fn relative_file_path(data_root: Option<&Path>, owner: &str, file: &str) -> String {
    let trimmed = file.trim();
    if let Some(root) = data_root {
        let prefix = root.join(owner).join("files");
        if let Ok(rest) = Path::new(trimmed).strip_prefix(&prefix) {
            let rest = rest.to_string_lossy().replace('\\', "/");
            return format!("/{}", rest.trim_start_matches('/'));
        }
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

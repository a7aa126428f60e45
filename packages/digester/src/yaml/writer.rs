//! YAML rendering of digested object graphs.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde_yaml_ng::{Mapping, Value};

use crate::error::{DigestError, Result};
use crate::object::ObjectRef;
use crate::types::Record;

/// Build the YAML tree for an object graph.
///
/// Records become mappings: properties first, then children grouped by name
/// into sequences. Objects of other types are shown by type name. A record
/// that contains itself is cut off at the repeat.
#[must_use]
pub fn to_yaml_value(root: &ObjectRef) -> Value {
    render(root, &mut Vec::new())
}

fn render(object: &ObjectRef, ancestors: &mut Vec<ObjectRef>) -> Value {
    if ancestors.iter().any(|ancestor| ancestor.ptr_eq(object)) {
        return Value::String(format!("<cycle {}>", object.type_name()));
    }
    let Some(record) = object.borrow::<Record>() else {
        return Value::String(object.type_name().to_string());
    };

    ancestors.push(object.clone());

    let mut mapping = Mapping::new();
    for (name, value) in record.properties() {
        mapping.insert(Value::String(name.clone()), Value::String(value.clone()));
    }

    let mut groups: Vec<(&str, Vec<Value>)> = Vec::new();
    for (name, child) in record.children() {
        let rendered = render(child, ancestors);
        match groups.iter().position(|(key, _)| *key == name.as_str()) {
            Some(index) => groups[index].1.push(rendered),
            None => groups.push((name.as_str(), vec![rendered])),
        }
    }
    for (name, items) in groups {
        mapping.insert(Value::String(name.to_string()), Value::Sequence(items));
    }

    ancestors.pop();
    Value::Mapping(mapping)
}

/// Open block sequences, by the column of their `- ` markers.
///
/// serde_yaml_ng writes sequence items at the column of their parent key.
/// Every open sequence shifts the lines inside it two more columns right:
///
/// ```yaml
/// # Before:        # After:
/// server:          server:
/// - host: a          - host: a
///   port: '1'          port: '1'
/// ```
#[derive(Debug, Default)]
struct OpenSequences {
    columns: Vec<usize>,
}

impl OpenSequences {
    /// Extra columns for a line starting at `column`.
    fn shift(&mut self, column: usize, is_item: bool) -> usize {
        // Columns are strictly increasing; everything deeper than this line
        // is closed, and so is a sequence at this column unless the line
        // continues it.
        self.columns
            .retain(|&open| open < column || (open == column && is_item));
        if is_item && self.columns.last() != Some(&column) {
            self.columns.push(column);
        }
        self.columns.len() * 2
    }
}

/// Re-indent serde_yaml_ng output so sequences nest under their key, and
/// strip trailing whitespace.
fn indent_sequences(yaml: &str) -> String {
    let mut open = OpenSequences::default();
    yaml.lines()
        .map(|line| {
            let content = line.trim();
            if content.is_empty() {
                return String::new();
            }
            let column = line.len() - line.trim_start().len();
            let shift = open.shift(column, content.starts_with("- "));
            format!("{}{content}", " ".repeat(column + shift))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render an object graph as a YAML document.
///
/// # Errors
/// `Render` if serialization fails.
pub fn generate_yaml(root: &ObjectRef) -> Result<String> {
    let yaml = serde_yaml_ng::to_string(&to_yaml_value(root)).map_err(DigestError::Render)?;
    Ok(format!("---\n{}\n", indent_sequences(&yaml)))
}

/// Write an object graph as YAML to `path`.
///
/// Writes to a temporary sibling file first and renames it into place, so a
/// failed write never leaves a truncated file behind.
///
/// # Errors
/// `Render` if serialization fails, `Io` if the file cannot be written.
pub fn save_yaml(root: &ObjectRef, path: &Path) -> Result<()> {
    let content = generate_yaml(root)?;
    let io_error = |source: std::io::Error| DigestError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_file = path.with_file_name(format!(".{file_name}.tmp"));

    {
        let mut file = File::create(&temp_file).map_err(io_error)?;
        file.write_all(content.as_bytes()).map_err(io_error)?;
        file.sync_all().map_err(io_error)?;
    }

    #[cfg(target_os = "windows")]
    if path.exists() {
        fs::remove_file(path).map_err(io_error)?;
    }

    fs::rename(&temp_file, path).map_err(io_error)?;
    Ok(())
}

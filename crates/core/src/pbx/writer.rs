use std::collections::BTreeMap;

use super::{Atom, Dict, Entry, Value};

const HEADER: &str = "// !$*UTF8*$!";

/// Object kinds Xcode writes on a single line.
const INLINE_ISAS: &[&str] = &["PBXBuildFile", "PBXFileReference"];

/// Render a top-level dictionary in Xcode's layout.
///
/// The root `objects` dictionary is split into `Begin/End <isa> section`
/// blocks ordered by isa; objects keep their tree order inside a section.
pub fn write(root: &Dict) -> String {
    let mut out = String::with_capacity(64 * 1024);
    out.push_str(HEADER);
    out.push_str("\n{\n");
    for entry in root.iter() {
        match (&entry.value, entry.key.text.as_str()) {
            (Value::Dict(objects), "objects") => write_objects(&mut out, &entry.key, objects),
            _ => write_entry(&mut out, entry, 1),
        }
    }
    out.push_str("}\n");
    out
}

/// Whether a string must be quoted to survive a round trip.
pub fn needs_quotes(text: &str) -> bool {
    text.is_empty()
        || !text.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | '.'))
}

fn isa_of(value: &Value) -> Option<&str> {
    value.as_dict().and_then(|dict| dict.get_str("isa"))
}

fn write_objects(out: &mut String, key: &Atom, objects: &Dict) {
    let mut sections: BTreeMap<&str, Vec<&Entry>> = BTreeMap::new();
    let mut loose = Vec::new();
    for entry in objects.iter() {
        match isa_of(&entry.value) {
            Some(isa) => sections.entry(isa).or_default().push(entry),
            None => loose.push(entry),
        }
    }

    indent(out, 1);
    write_atom(out, key);
    out.push_str(" = {\n");
    for entry in loose {
        write_entry(out, entry, 2);
    }
    for (isa, entries) in sections {
        out.push_str(&format!("\n/* Begin {isa} section */\n"));
        let inline = INLINE_ISAS.contains(&isa);
        for entry in entries {
            if inline {
                indent(out, 2);
                write_atom(out, &entry.key);
                out.push_str(" = ");
                write_inline(out, &entry.value);
                out.push_str(";\n");
            } else {
                write_entry(out, entry, 2);
            }
        }
        out.push_str(&format!("/* End {isa} section */\n"));
    }
    indent(out, 1);
    out.push_str("};\n");
}

fn write_entry(out: &mut String, entry: &Entry, depth: usize) {
    indent(out, depth);
    write_atom(out, &entry.key);
    out.push_str(" = ");
    write_value(out, &entry.value, depth);
    out.push_str(";\n");
}

fn write_value(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Atom(atom) => write_atom(out, atom),
        Value::Dict(dict) => {
            out.push_str("{\n");
            for entry in dict.iter() {
                write_entry(out, entry, depth + 1);
            }
            indent(out, depth);
            out.push('}');
        }
        Value::Array(items) => {
            out.push_str("(\n");
            for item in items {
                indent(out, depth + 1);
                write_value(out, item, depth + 1);
                out.push_str(",\n");
            }
            indent(out, depth);
            out.push(')');
        }
    }
}

fn write_inline(out: &mut String, value: &Value) {
    match value {
        Value::Atom(atom) => write_atom(out, atom),
        Value::Dict(dict) => {
            out.push('{');
            for entry in dict.iter() {
                write_atom(out, &entry.key);
                out.push_str(" = ");
                write_inline(out, &entry.value);
                out.push_str("; ");
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('(');
            for item in items {
                write_inline(out, item);
                out.push_str(", ");
            }
            out.push(')');
        }
    }
}

fn write_atom(out: &mut String, atom: &Atom) {
    write_string(out, &atom.text);
    if let Some(comment) = &atom.comment {
        out.push_str(" /* ");
        out.push_str(comment);
        out.push_str(" */");
    }
}

fn write_string(out: &mut String, text: &str) {
    if !needs_quotes(text) {
        out.push_str(text);
        return;
    }
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

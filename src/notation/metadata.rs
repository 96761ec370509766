// Metadata XML - The harmonyHubExercise document stored beside each score

use std::fmt::Write;

use super::escape_xml;
use crate::exercise::ExerciseMetadata;

pub fn write_metadata_xml(exercise_id: &str, metadata: &ExerciseMetadata) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<harmonyHubExercise>\n");
    let _ = writeln!(xml, "  <exercise id=\"{}\">", escape_xml(exercise_id));
    xml.push_str("    <metadata>\n");

    let fields = [
        ("title", metadata.title.clone()),
        ("instrument", metadata.instrument.clone()),
        ("key", metadata.key.clone()),
        ("timeSignature", metadata.time_signature.clone()),
        ("difficulty", metadata.difficulty.clone()),
        ("focus", metadata.focus.clone()),
        ("bars", metadata.bars.to_string()),
        ("generatedAt", metadata.generated_at.to_rfc3339()),
    ];
    for (tag, value) in fields {
        let _ = writeln!(xml, "      <{tag}>{}</{tag}>", escape_xml(&value));
    }

    xml.push_str("    </metadata>\n  </exercise>\n</harmonyHubExercise>\n");
    xml
}

//! Prompt templates sent to the text agents.

use curio_core::record::TermRecord;

/// Ask the curation agent to embed one false claim in a definition.
pub fn injection_prompt(record: &TermRecord) -> String {
    format!(
        "Insert a biologically plausible but false assertion into the following cell type \
         definition in a natural and convincing way. \
         Return only a JSON object with keys updated_definition and false_assertion. \
         Do not include any additional text or explanation. \
         Cell Type: \"{}\" Definition: \"{}\"",
        record.name, record.definition
    )
}

/// Ask the literature agent for an assertion/validation table.
pub fn literature_prompt(record: &TermRecord) -> String {
    format!(
        "For the following text, first break down the definition into individual, atomic \
         assertions. Each assertion should be a single, verifiable statement. After extracting \
         the assertions, create a table with the following columns:\n\
         - Assertion: A single, verifiable statement about the cell type.\n\
         - Validated: A strict \"True\" or \"False\" value. This column should only \
         contain \"True\" if the entire assertion is stated and supported by the provided \
         literature. If the literature contradicts the assertion, or is not supported, the \
         value must be False.\n\
         - Evidence: A brief summary of the evidence from the literature that supports the \
         \"Validated\" column's value.\n\
         - References: The sources from the literature that were used for validation.\n\n\
         name: {}\n\
         def: \"{}\"\n\
         {}",
        record.name,
        record.definition,
        axiom_fragments(&record.logical_axioms).join("\n")
    )
}

/// Ask the curation agent to turn a markdown report into a JSON row array.
pub fn table_conversion_prompt(report_markdown: &str) -> String {
    format!(
        "From the following input, extract only the markdown table and convert it into a JSON \
         array of objects. Each object should have the keys assertion, validated (True/False), \
         summary_text, and references. Ignore all non-table text and output only the JSON. \
         Report:\n{}\n",
        report_markdown
    )
}

/// Split logical axioms into sentence-like fragments on '.'.
pub fn axiom_fragments(axioms: &str) -> Vec<&str> {
    axioms
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

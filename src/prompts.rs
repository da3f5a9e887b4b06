//! Prompt templates for the two agents.
//!
//! Both templates are fixed: the only variable part is the text embedded
//! between the delimiter lines. Keeping them here means tests can inspect
//! the exact wording without a model in the loop.

/// Opening delimiter around the pasted document.
pub const DOCUMENT_START: &str = "--- MEDICAL DOCUMENT TEXT ---";
/// Closing delimiter around the pasted document.
pub const DOCUMENT_END: &str = "--- END OF DOCUMENT ---";
/// Opening delimiter around the structured data.
pub const DATA_START: &str = "--- STRUCTURED MEDICAL DATA ---";
/// Closing delimiter around the structured data.
pub const DATA_END: &str = "--- END OF DATA ---";

/// Sections the Data Retriever Agent is asked to extract.
pub const EXTRACTION_SECTIONS: [&str; 7] = [
    "Patient Information",
    "Chief Complaint / Reason for Visit",
    "History of Present Illness",
    "Past Medical History",
    "Lab Results / Vitals",
    "Current Medications",
    "Diagnosis / Impression",
];

/// Headings the Medical Facilitator Agent is asked to produce, in order.
pub const REPORT_SECTIONS: [&str; 8] = [
    "## Final Integrated Report",
    "### Patient Summary",
    "### Imaging Analysis",
    "### Correlated Diagnosis",
    "### Recommendations",
    "### Treatment Plan Generation",
    "### Travel & Logistics",
    "### Patient Advocacy",
];

const EXTRACTION_PREAMBLE: &str = r#"You are a highly efficient Data Retriever Agent for a medical context.
Your task is to extract, structure, and summarize the key information from the following medical document text.
Present the output in a clean, easy-to-read format using Markdown. Do not add any conversational text, just the structured data.

Key sections to identify:
- Patient Information (Name, Age, Gender, etc.)
- Chief Complaint / Reason for Visit
- History of Present Illness
- Past Medical History
- Lab Results / Vitals
- Current Medications
- Diagnosis / Impression

If a section is not present, omit it."#;

const SYNTHESIS_PREAMBLE: &str = r#"You are a sophisticated Medical Facilitator Agent.
Your role is to synthesize information from a structured medical data report and a medical image (like an X-ray) to generate a comprehensive final report that includes clinical analysis, logistical planning, and patient advocacy.

**Instructions:**
1.  Analyze the structured data provided.
2.  Analyze the provided medical image.
3.  Integrate findings from both sources into a coherent final report.
4.  Structure the report with the following sections using Markdown:
    - **## Final Integrated Report**
    - **### Patient Summary** (Briefly summarize the patient case based on the structured data)
    - **### Imaging Analysis** (Describe your findings from the medical image)
    - **### Correlated Diagnosis** (Combine information from both text and image to provide a potential diagnosis or assessment)
    - **### Recommendations** (Suggest next steps, further tests, or initial treatment considerations)
    - **### Treatment Plan Generation** (Outline a potential, more detailed treatment plan. This can include phases, types of therapy, specialist consultations, etc.)
    - **### Travel & Logistics** (Based on the diagnosis and treatment plan, provide considerations for travel, accommodation, and scheduling if specialized care might be required far from home.)
    - **### Patient Advocacy** (Suggest key questions and topics for the patient to discuss with their healthcare provider to ensure they are fully informed and involved in their care decisions.)
5.  Maintain a professional, clinical, yet supportive tone."#;

/// Build the extraction prompt. The document is embedded verbatim.
pub fn extraction_prompt(document_text: &str) -> String {
    format!("{EXTRACTION_PREAMBLE}\n\n{DOCUMENT_START}\n{document_text}\n{DOCUMENT_END}\n")
}

/// Build the synthesis instruction text. The structured data is embedded verbatim.
pub fn synthesis_prompt(structured_data: &str) -> String {
    format!("{SYNTHESIS_PREAMBLE}\n\n{DATA_START}\n{structured_data}\n{DATA_END}\n")
}

//! Prompt templates for the LLM-backed collaborators.

use habicase_core::Case;

use crate::types::ImageInput;

pub const CLASSIFIER_SYSTEM_PROMPT: &str = "\
You help tenants document habitability problems in their rental home.

Given the tenant's description (and a photo, if attached), describe the issue.

Respond ONLY with a JSON object. No markdown fences, no explanation, just raw JSON:
{
  \"issue\": {
    \"title\": \"short title, under 60 characters\",
    \"category\": \"e.g. Plumbing, Heating, Electrical, Mold, Pests, Structural, Safety\",
    \"room\": \"where in the home\",
    \"severity\": \"low\" | \"medium\" | \"high\" | \"emergency\",
    \"status\": \"ongoing\" | \"resolved\" | \"partial\",
    \"first_noticed_at\": \"YYYY-MM-DD if the tenant said when, else omit\",
    \"description\": \"neutral, factual restatement\",
    \"habitability_categories\": [\"e.g. heat, water, weatherproofing, sanitation\"]
  },
  \"evidence_items\": [{\"caption\": \"factual caption of what the photo shows\"}],
  \"disclaimers\": [\"anything the tenant should double-check\"],
  \"summary\": \"one sentence\"
}

Omit any field you cannot support from the input. Never invent dates.";

pub const REPORT_SYSTEM_PROMPT: &str = "\
You prepare habitability case reports for tenants to share with landlords, \
housing inspectors, or legal aid.

Given the case as JSON (property, landlord contact, lease, issues, evidence \
captions, and communications with any landlord promises), write a factual report.

Respond ONLY with a JSON object. No markdown fences, no explanation, just raw JSON:
{
  \"report_body\": \"the full report in markdown\",
  \"timeline_narrative\": \"a short chronological summary\",
  \"pattern_narrative\": \"patterns such as repeated unanswered requests or broken promises\"
}

Use only facts present in the case. Do not give legal advice.";

pub fn build_analysis_prompt(description: &str, image: Option<&ImageInput>) -> String {
    let photo = if image.is_some() {
        "A photo is attached."
    } else {
        "No photo attached."
    };
    format!(
        "Tenant description:\n\
         {description}\n\
         \n\
         {photo}"
    )
}

/// Case JSON for the report prompt. Embedded image payloads are replaced
/// with a marker; captions carry what the model needs.
pub fn build_report_prompt(case: &Case) -> Result<String, serde_json::Error> {
    let mut case = case.clone();
    for item in &mut case.evidence {
        if item.file_reference.starts_with("data:") {
            item.file_reference = "[embedded image]".to_string();
        }
    }
    let json = serde_json::to_string_pretty(&case)?;
    Ok(format!("Case:\n{json}"))
}

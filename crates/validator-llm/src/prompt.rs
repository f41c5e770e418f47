// Prompt template for data checking.

/// Build the single user message sent to the model for `data`.
///
/// The reply contract (`CORRECT` or `WRONG: ...`) is spelled out in the last
/// line so that [`crate::verdict::Verdict::parse`] can recognise it.
pub fn build_check_prompt(data: &str) -> String {
    format!(
        "You are an expert data checker agent. Your task is to verify the given data.\n\
         Data: {data}\n\
         Is this data correct? If not, what is the error?\n\
         Reply only with \"CORRECT\" or \"WRONG: describe the error\"."
    )
}

/// Drops blank lines and trailing whitespace.
///
/// Leading indentation is kept so nested lists in survey notes survive.
/// Applying it twice gives the same result as applying it once.
pub fn compress_prompt(prompt: &str) -> String {
    prompt
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim_start().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

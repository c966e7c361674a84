use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

const EMBEDDED_PROMPTS: &[(&str, &str)] = &[
    ("enhancer.md", include_str!("prompts/enhancer.md")),
    ("code_generator.md", include_str!("prompts/code_generator.md")),
    (
        "code_generator_concise.md",
        include_str!("prompts/code_generator_concise.md"),
    ),
];

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

/// Render one of the prompts compiled into the crate
pub fn load_embedded_prompt<T: Serialize>(name: &str, context_data: &T) -> Result<String, TeraError> {
    let template = EMBEDDED_PROMPTS
        .iter()
        .find(|(file, _)| *file == name)
        .map(|(_, template)| *template)
        .ok_or_else(|| TeraError::msg(format!("Unknown prompt template: {}", name)))?;
    load_prompt(template, context_data)
}

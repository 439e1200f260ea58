use crate::Configurable;
use crate::field::FieldDescriptor;
use std::{fs, path::Path};

/// Render a markdown table describing every public leaf field
pub fn render_markdown(fields: &[FieldDescriptor]) -> String {
    let mut md = String::new();

    md.push_str("## Configuration Fields Summary\n\n");
    md.push_str("| Field | Type | Default | Sources |\n");
    md.push_str("|-------|------|---------|---------|\n");
    for field in fields {
        let default_display = match field.tag("default") {
            Some(value) if !value.is_empty() => value,
            _ => "-",
        };
        let sources = field
            .tags
            .iter()
            .filter(|(key, _)| *key != "default")
            .map(|(key, value)| format!("{}: `{}`", key, value))
            .collect::<Vec<_>>();
        let sources_display = if sources.is_empty() {
            "-".to_string()
        } else {
            sources.join(", ")
        };

        md.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            field.name, field.type_name, default_display, sources_display
        ));
    }

    md
}

/// Write configuration documentation for `T` to a markdown file
///
/// # Example
/// ```no_run
/// use config_chain::{Configurable, docs};
///
/// #[derive(Default, Configurable)]
/// struct Server {
///     #[config(env = "PORT", default = 8080)]
///     pub port: u16,
/// }
///
/// docs::write_docs::<Server>("CONFIG.md").unwrap();
/// ```
pub fn write_docs<T: Configurable>(path: impl AsRef<Path>) -> std::io::Result<()> {
    let mut fields = Vec::new();
    T::describe(&mut fields);

    fs::write(path, render_markdown(&fields))
}

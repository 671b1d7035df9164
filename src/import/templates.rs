//! Downloadable CSV templates: the fixed header row plus one example row.

use ::csv::WriterBuilder;

use crate::import::ImportKind;

const PLACEHOLDER_UUID: &str = "00000000-0000-0000-0000-000000000000";

fn example_row(kind: ImportKind) -> Vec<&'static str> {
    match kind {
        ImportKind::Categories => vec![
            "Programación",
            "Cursos de desarrollo de software",
            "code",
            "#3b82f6",
        ],
        ImportKind::Courses => vec![
            "Introducción a Rust",
            "Aprende Rust desde cero",
            PLACEHOLDER_UUID,
            "",
            "beginner",
            "draft",
            "49.99",
            "12",
            "https://example.com/rust.png",
            r#"["Conocimientos básicos de programación"]"#,
            r#"["Ownership","Traits","Async"]"#,
        ],
        ImportKind::Lessons => vec![
            PLACEHOLDER_UUID,
            "Instalación del entorno",
            "Configura rustup y cargo",
            "Contenido de la lección",
            "https://example.com/video.mp4",
            "15",
            "1",
            "true",
        ],
        ImportKind::Users => vec![
            "estudiante@ejemplo.com",
            "CambiarEsto123",
            "Ana García",
            "student",
            "",
        ],
    }
}

/// Render the template for `kind` as CSV text.
pub fn template_csv(kind: ImportKind) -> Result<String, ::csv::Error> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(kind.columns())?;
    writer.write_record(example_row(kind))?;
    let bytes = writer
        .into_inner()
        .map_err(|err| ::csv::Error::from(err.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn template_filename(kind: ImportKind) -> String {
    format!("{kind}_template.csv")
}

//! Prompt builder for institutional press alerts.
//!
//! [`PromptBuilder`] turns `(current date, style examples)` into the prompt
//! text sent next to the audio.  The date appears verbatim wherever the
//! alert structure needs it, and the style examples are appended as a
//! clearly marked reference section only when they are non-empty.
//!
//! The language is selected at construction time; Spanish (`"es"`) and
//! English (`"en"`) have dedicated instructions and date formats.  Any other
//! code falls back to Spanish.
//!
//! Speaker attribution follows a strict policy: a voice is attributed to a
//! person only when the audio itself says who is speaking.

use chrono::{Datelike, NaiveDate};

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

const DATE_SLOT: &str = "{{DATE}}";
const STYLE_SLOT: &str = "{{STYLE}}";

const INSTRUCTIONS_ES: &str = "\
ACTÚA COMO:
Redactor/a senior de Comunicación Social.

OBJETIVO:
Escucha el audio proporcionado y genera una \"Alerta de Prensa\" fiel al audio, \
con una extensión proporcional a su duración y densidad informativa.

VERACIDAD:
1) Usa solo información explícita en el audio. No inventes ni completes con conocimiento externo.
2) Si un dato (fecha, lugar, cifra, nombre, cargo, dependencia) no se escucha con claridad, omítelo.
3) No uses marcadores como [inaudible]; lo dudoso simplemente no se incluye.
4) IDENTIFICACIÓN DE VOCES: atribuye una voz a una persona solo si el propio audio lo confirma \
(\"Soy…\", \"Me acompaña…\", una presentación directa). Sin esa confirmación usa atribuciones \
neutrales: \"la oradora\", \"el orador\", \"una funcionaria\", \"un funcionario\". \
Prohibido reconocer a alguien por su voz.

FORMATO (sin Markdown, salvo los asteriscos indicados):
- Encabezado institucional en una sola línea, con un asterisco al inicio y uno al final.
- Fecha, en texto plano, exactamente: {{DATE}}
- Titular en una sola línea, con un asterisco al inicio y uno al final.
- Cuerpo de 1 a 4 párrafos en texto plano: sin asteriscos, viñetas ni numeración.
  Audio corto: 1–2 párrafos. Audio medio: 2–3 párrafos. Audio largo: 3–4 párrafos.
- Cierre institucional breve, solo si el audio lo sustenta.
- Primera mención de una institución con su nombre completo y siglas entre paréntesis.
{{STYLE}}
ESTRUCTURA DE SALIDA:
*[ENCABEZADO INSTITUCIONAL]*
{{DATE}}

*[TITULAR]*

[Cuerpo]

[Cierre]

Entrega SOLO el texto final en español. La fecha debe ser exactamente {{DATE}}.
";

const INSTRUCTIONS_EN: &str = "\
ACT AS:
A senior press officer in an institutional communications office.

GOAL:
Listen to the attached audio and write a \"Press Alert\" faithful to it, with a \
length proportional to the audio's duration and information density.

ACCURACY:
1) Use only information stated explicitly in the audio. Do not invent or add outside knowledge.
2) If a detail (date, place, figure, name, title, agency) is not clearly audible, leave it out.
3) Do not use markers such as [inaudible]; uncertain content is simply omitted.
4) SPEAKER IDENTIFICATION: attribute a voice to a person only when the audio itself confirms \
it (\"I am…\", \"Joining me is…\", a direct introduction). Otherwise use neutral attributions: \
\"the speaker\", \"an official\". Never identify anyone by voice recognition.

FORMAT (no Markdown except the asterisks below):
- Institutional header on one line, with one asterisk at the start and one at the end.
- Date, as plain text, exactly: {{DATE}}
- Headline on one line, with one asterisk at the start and one at the end.
- Body of 1 to 4 plain-text paragraphs: no asterisks, bullets or numbering.
  Short audio: 1–2 paragraphs. Medium: 2–3. Long: 3–4.
- A short institutional closing, only if the audio supports it.
- First mention of an institution uses its full name with the acronym in parentheses.
{{STYLE}}
OUTPUT STRUCTURE:
*[INSTITUTIONAL HEADER]*
{{DATE}}

*[HEADLINE]*

[Body]

[Closing]

Return ONLY the final text. The date must be exactly {{DATE}}.
";

const STYLE_HEADING_ES: &str = "ESTILO DE REFERENCIA (IMÍTALO):";
const STYLE_HEADING_EN: &str = "REFERENCE STYLE (IMITATE IT):";

// ---------------------------------------------------------------------------
// Calendar names
// ---------------------------------------------------------------------------

const WEEKDAYS_ES: [&str; 7] = [
    "domingo", "lunes", "martes", "miércoles", "jueves", "viernes", "sábado",
];
const MONTHS_ES: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto", "septiembre",
    "octubre", "noviembre", "diciembre",
];

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds press-alert prompts.
///
/// # Example
/// ```rust
/// use chrono::NaiveDate;
/// use press_alert::generation::PromptBuilder;
///
/// let builder = PromptBuilder::new("es");
/// let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
/// assert_eq!(builder.format_date(date), "Lunes 19 de octubre de 2026");
///
/// let prompt = builder.build(date, "");
/// assert!(prompt.contains("Lunes 19 de octubre de 2026"));
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    language: String,
}

impl PromptBuilder {
    /// Create a builder for a locale tag (`es`, `es-MX`, `en-US`, ...).
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_ascii_lowercase(),
        }
    }

    /// Only the primary subtag counts: `en-US` and `en_GB` are English.
    fn is_english(&self) -> bool {
        self.language.split(['-', '_']).next() == Some("en")
    }

    /// Long-form date with the weekday capitalised.
    ///
    /// * `es` — `"Lunes 19 de octubre de 2026"`
    /// * `en` — `"Monday, October 19, 2026"`
    pub fn format_date(&self, date: NaiveDate) -> String {
        if self.is_english() {
            return date.format("%A, %B %-d, %Y").to_string();
        }

        let weekday = WEEKDAYS_ES[date.weekday().num_days_from_sunday() as usize];
        let month = MONTHS_ES[date.month0() as usize];
        capitalize_first(&format!("{weekday} {} de {month} de {}", date.day(), date.year()))
    }

    /// Build the full prompt for `date`, biased by `style_examples`.
    pub fn build(&self, date: NaiveDate, style_examples: &str) -> String {
        let (template, heading) = if self.is_english() {
            (INSTRUCTIONS_EN, STYLE_HEADING_EN)
        } else {
            (INSTRUCTIONS_ES, STYLE_HEADING_ES)
        };

        let style = if style_examples.trim().is_empty() {
            String::new()
        } else {
            format!("\n{heading}\n{}\n", style_examples.trim_end())
        };

        template
            .replace(DATE_SLOT, &self.format_date(date))
            .replace(STYLE_SLOT, &style)
    }
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

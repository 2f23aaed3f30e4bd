/// vCard 3.0 payload generation for the card QR code
///
/// The block has a fixed line order and `\n` terminators:
/// BEGIN, VERSION, N, FN, TITLE, EMAIL, TEL, COMPANY, optional work URL, END.

/// Contact fields that end up in the QR payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VCardFields<'a> {
    pub name: &'a str,
    pub company: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub title: &'a str,
    pub linkedin_url: &'a str,
}

/// Encode contact fields into a vCard text block
///
/// Text values (name, title, company) are escaped with vCard 3.0 rules so an
/// embedded `;`, `,` or newline cannot break the structure of the block.
/// Email, phone and URL values only lose their line breaks.
pub fn encode(fields: &VCardFields<'_>) -> String {
    let name = escape_text(fields.name);

    let mut lines = vec![
        "BEGIN:VCARD".to_string(),
        "VERSION:3.0".to_string(),
        format!("N:{};;;;", name),
        format!("FN:{}", name),
        format!("TITLE:{}", escape_text(fields.title)),
        format!("EMAIL:{}", strip_line_breaks(fields.email)),
        format!("TEL:+{}", normalize_phone(fields.phone)),
        format!("COMPANY:{}", escape_text(fields.company)),
    ];

    let linkedin = strip_line_breaks(fields.linkedin_url);
    if !linkedin.trim().is_empty() {
        lines.push(format!("URL;type=WORK:{}", linkedin.trim()));
    }

    lines.push("END:VCARD".to_string());
    lines.join("\n")
}

/// Phone number as printed after the `+` prefix
///
/// A leading `+` already present in the source is dropped so the prefix is never doubled.
pub fn normalize_phone(phone: &str) -> String {
    strip_line_breaks(phone)
        .trim()
        .trim_start_matches('+')
        .to_string()
}

fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                escaped.push_str("\\n");
            }
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }

    escaped
}

fn strip_line_breaks(value: &str) -> String {
    value.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

//! Fixed adversarial payload taxonomy

use crate::VulnerabilityKind;

pub const SQLI_FIELDS: &[&str] = &["query", "id", "search"];
pub const XSS_FIELDS: &[&str] = &["input", "name", "content"];
pub const TRAVERSAL_FIELDS: &[&str] = &["file", "path", "filename"];
pub const NEGATIVE_FIELDS: &[&str] = &["id", "quantity", "amount"];

pub const SQLI_PAYLOADS: &[&str] = &[
    "' OR 1=1 --",
    "' OR '1'='1",
    "'; DROP TABLE users; --",
    "1' UNION SELECT NULL, NULL --",
];

pub const XSS_PAYLOADS: &[&str] = &[
    "<script>alert('XSS')</script>",
    "<img src=x onerror=alert(1)>",
    "\"><svg onload=alert(1)>",
];

pub const TRAVERSAL_PAYLOADS: &[&str] = &[
    "../../../etc/passwd",
    "..\\..\\..\\windows\\win.ini",
    "....//....//....//etc/passwd",
];

/// What an attempt sends
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    /// One string placed in one field
    Field { field: &'static str, value: String },
    /// A string of `len` characters in the `data` field
    Oversized { len: usize },
    /// -1 in every negative field
    Negative,
    /// No body and no credential
    NoCredential,
}

/// One security attempt against a route
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub kind: VulnerabilityKind,
    pub value: PayloadValue,
}

impl Payload {
    pub fn field(&self) -> Option<&'static str> {
        match &self.value {
            PayloadValue::Field { field, .. } => Some(*field),
            PayloadValue::Oversized { .. } => Some("data"),
            PayloadValue::Negative | PayloadValue::NoCredential => None,
        }
    }

    /// Payload as reported; oversized bodies are summarised
    pub fn describe(&self) -> String {
        match &self.value {
            PayloadValue::Field { value, .. } => value.clone(),
            PayloadValue::Oversized { len } => format!("<{} characters>", len),
            PayloadValue::Negative => NEGATIVE_FIELDS
                .iter()
                .map(|f| format!("{}=-1", f))
                .collect::<Vec<_>>()
                .join("&"),
            PayloadValue::NoCredential => "<no credential>".to_string(),
        }
    }
}

fn field_family(
    kind: VulnerabilityKind,
    fields: &'static [&'static str],
    values: &'static [&'static str],
) -> impl Iterator<Item = Payload> {
    fields.iter().copied().flat_map(move |field| {
        values.iter().copied().map(move |value| Payload {
            kind,
            value: PayloadValue::Field {
                field,
                value: value.to_string(),
            },
        })
    })
}

/// Every attempt for one route
pub fn catalogue(auth_required: bool, oversized_len: usize) -> Vec<Payload> {
    let mut payloads: Vec<Payload> = field_family(VulnerabilityKind::SqlInjection, SQLI_FIELDS, SQLI_PAYLOADS)
        .chain(field_family(VulnerabilityKind::Xss, XSS_FIELDS, XSS_PAYLOADS))
        .chain(field_family(
            VulnerabilityKind::PathTraversal,
            TRAVERSAL_FIELDS,
            TRAVERSAL_PAYLOADS,
        ))
        .collect();

    payloads.push(Payload {
        kind: VulnerabilityKind::OversizedPayload,
        value: PayloadValue::Oversized { len: oversized_len },
    });
    payloads.push(Payload {
        kind: VulnerabilityKind::NegativeValue,
        value: PayloadValue::Negative,
    });
    if auth_required {
        payloads.push(Payload {
            kind: VulnerabilityKind::UnauthorizedAccess,
            value: PayloadValue::NoCredential,
        });
    }
    payloads
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_shape() {
        let open = catalogue(false, 100_000);
        let guarded = catalogue(true, 100_000);
        assert_eq!(guarded.len(), open.len() + 1);
        assert!(!open.iter().any(|p| p.kind == VulnerabilityKind::UnauthorizedAccess));

        let sqli_fields: Vec<_> = open
            .iter()
            .filter(|p| p.kind == VulnerabilityKind::SqlInjection)
            .filter_map(|p| p.field())
            .collect();
        assert_eq!(sqli_fields.len(), SQLI_FIELDS.len() * SQLI_PAYLOADS.len());
        assert!(sqli_fields.contains(&"search"));
        assert_eq!(
            open.iter()
                .filter(|p| p.kind == VulnerabilityKind::OversizedPayload)
                .count(),
            1
        );
    }

    #[test]
    fn test_oversized_is_summarised() {
        let payload = Payload {
            kind: VulnerabilityKind::OversizedPayload,
            value: PayloadValue::Oversized { len: 100_000 },
        };
        assert_eq!(payload.describe(), "<100000 characters>");
    }
}

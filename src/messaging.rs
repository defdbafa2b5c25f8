//! Outreach message and WhatsApp deep link construction.
//!
//! Everything here is pure string work; the qualifier calls it once per
//! retained row.
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use phonenumber::country::Id as CountryId;
use phonenumber::Mode;

/// Characters left as-is in the message query value: ASCII alphanumerics
/// plus `_ . - ~ /`. Everything else, space included, becomes `%XX` over
/// its UTF-8 bytes.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// Greeting name used when a row has no customer name.
pub const FALLBACK_FIRST_NAME: &str = "Cliente";

/// First whitespace-delimited token of `name`, capitalized.
///
/// `"joão silva"` becomes `"João"`, `"MARIA"` becomes `"Maria"`, and an
/// empty or blank name becomes `"Cliente"`.
pub fn format_first_name(name: &str) -> String {
    let Some(first) = name.split_whitespace().next() else {
        return FALLBACK_FIRST_NAME.to_string();
    };

    let mut chars = first.chars();
    match chars.next() {
        Some(head) => head
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => FALLBACK_FIRST_NAME.to_string(),
    }
}

/// Who signs the message.
#[derive(Debug, Clone, Copy)]
pub struct Signature<'a> {
    pub consultant: &'a str,
    pub brand: &'a str,
}

/// Abandoned-order outreach text. The order number appears twice.
pub fn build_message(first_name: &str, order_id: &str, signature: Signature<'_>) -> String {
    format!(
        "Olá {first}! Aqui é a {consultant}, sua *consultora exclusiva da {brand}!*\n\
         Tenho uma ótima notícia para você.\n\n\
         Vi que você iniciou seu cadastro (Pedido n. {order}), mas não conseguiu finalizar a compra.\n\
         Para eu te ajudar, poderia me contar o motivo?\n\n\
         Consegui separar *UM BRINDE ESPECIAL* para incluir no seu pedido n. {order}, e quero garantir que você receba tudo certinho.\n\n\
         Conte comigo para cuidar de você!",
        first = first_name,
        consultant = signature.consultant,
        brand = signature.brand,
        order = order_id,
    )
}

/// Label shown on the contact button for a lead.
pub fn button_label(order_id: &str) -> String {
    format!("Chamar no WhatsApp (Pedido {})", order_id)
}

/// ASCII digits of `phone`, in order.
pub fn phone_digits(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Percent-encodes a message for use as a URL query value.
pub fn encode_query_value(message: &str) -> String {
    utf8_percent_encode(message, QUERY_VALUE).to_string()
}

/// `https://wa.me/<country_code><digits>?text=<encoded message>`.
///
/// The phone is not validated; whatever digits it has are used.
pub fn whatsapp_link(phone: &str, message: &str, country_code: &str) -> String {
    format!(
        "https://wa.me/{}{}?text={}",
        country_code,
        phone_digits(phone),
        encode_query_value(message)
    )
}

/// Normalizes a Brazilian phone to E.164 (`+5511987654321`).
///
/// Uses phonenumber (port of Google's libphonenumber) with region BR.
/// Returns `None` for numbers that do not parse or are not valid.
pub fn normalize_br_phone(raw: &str) -> Option<String> {
    let digits = phone_digits(raw);
    if digits.len() < 8 {
        return None;
    }

    match phonenumber::parse(Some(CountryId::BR), &digits) {
        Ok(number) if phonenumber::is_valid(&number) => {
            Some(number.format().mode(Mode::E164).to_string())
        }
        Ok(_) => {
            tracing::debug!("Invalid BR phone number: {}", raw);
            None
        }
        Err(e) => {
            tracing::debug!("Failed to parse BR phone '{}': {:?}", raw, e);
            None
        }
    }
}

pub fn is_plausible_br_phone(raw: &str) -> bool {
    normalize_br_phone(raw).is_some()
}

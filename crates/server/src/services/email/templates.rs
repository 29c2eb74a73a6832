//! Rendered emails: magic link and the two confirmations.

use askama::Template;

use boxset_core::{Amount, Bic, FormatChoice, Iban, PackLine, PhysicalFormat, PostalAddress};

use crate::models::{CredentialPurpose, Customer, OutgoingEmail};
use crate::services::credential::TOKEN_TTL_HOURS;

/// HTML template for the magic link email.
#[derive(Template)]
#[template(path = "email/magic_link.html")]
struct MagicLinkHtml<'a> {
    greeting: Option<&'a str>,
    sender_name: &'a str,
    intro: &'a str,
    link: &'a str,
    refund_amount: Option<i64>,
    valid_hours: i64,
}

/// Plain text template for the magic link email.
#[derive(Template)]
#[template(path = "email/magic_link.txt")]
struct MagicLinkText<'a> {
    greeting: Option<&'a str>,
    sender_name: &'a str,
    intro: &'a str,
    link: &'a str,
    refund_amount: Option<i64>,
    valid_hours: i64,
}

/// One product line in the format recap.
struct RecapLine {
    name: &'static str,
    cd: u32,
    vinyle: u32,
}

/// HTML template for the format choice confirmation.
#[derive(Template)]
#[template(path = "email/format_choice_confirmation.html")]
struct FormatChoiceHtml<'a> {
    greeting: Option<&'a str>,
    sender_name: &'a str,
    lines: &'a [RecapLine],
    address: &'a [String],
}

/// Plain text template for the format choice confirmation.
#[derive(Template)]
#[template(path = "email/format_choice_confirmation.txt")]
struct FormatChoiceText<'a> {
    greeting: Option<&'a str>,
    sender_name: &'a str,
    lines: &'a [RecapLine],
    address: &'a [String],
}

/// HTML template for the refund confirmation.
#[derive(Template)]
#[template(path = "email/refund_confirmation.html")]
struct RefundHtml<'a> {
    greeting: Option<&'a str>,
    sender_name: &'a str,
    amount: i64,
    address: &'a [String],
    iban: &'a str,
    bic: &'a str,
}

/// Plain text template for the refund confirmation.
#[derive(Template)]
#[template(path = "email/refund_confirmation.txt")]
struct RefundText<'a> {
    greeting: Option<&'a str>,
    sender_name: &'a str,
    amount: i64,
    address: &'a [String],
    iban: &'a str,
    bic: &'a str,
}

fn address_lines(address: &PostalAddress) -> Vec<String> {
    let mut lines = vec![address.line1.clone()];
    if let Some(line2) = &address.line2 {
        lines.push(line2.clone());
    }
    lines.push(format!("{} {}", address.postal_code, address.city));
    lines.push(address.country.clone());
    lines
}

fn recap(customer: &Customer, choices: &[FormatChoice]) -> Vec<RecapLine> {
    let quantity = |line: PackLine, format: PhysicalFormat| {
        choices
            .iter()
            .filter(|c| c.pack_line == line && c.format == format)
            .map(|c| c.quantity)
            .sum::<u32>()
    };

    customer
        .packs
        .iter()
        .filter(|&(_, count)| count > 0)
        .map(|(line, _)| RecapLine {
            name: line.display_name(),
            cd: quantity(line, PhysicalFormat::Cd),
            vinyle: quantity(line, PhysicalFormat::Vinyle),
        })
        .collect()
}

/// Compose the email carrying a magic link.
///
/// # Errors
///
/// Returns an error if a template fails to render.
pub fn magic_link_email(
    customer: &Customer,
    sender_name: &str,
    purpose: CredentialPurpose,
    link: &str,
) -> Result<OutgoingEmail, askama::Error> {
    let (subject, intro, refund_amount) = match purpose {
        CredentialPurpose::Refund => (
            "Demande de remboursement",
            "Vous pouvez demander le remboursement de vos packs en suivant ce lien :",
            Some(customer.computed_refund().rounded()),
        ),
        CredentialPurpose::FormatChoice => (
            "Choix du format de vos packs",
            "Vous pouvez choisir le format (CD ou vinyle) de vos packs en suivant ce lien :",
            None,
        ),
    };
    let greeting = customer.greeting_name();

    let html = MagicLinkHtml {
        greeting,
        sender_name,
        intro,
        link,
        refund_amount,
        valid_hours: TOKEN_TTL_HOURS,
    }
    .render()?;
    let text = MagicLinkText {
        greeting,
        sender_name,
        intro,
        link,
        refund_amount,
        valid_hours: TOKEN_TTL_HOURS,
    }
    .render()?;

    Ok(OutgoingEmail {
        to: customer.email.clone(),
        to_name: customer.display_name(),
        subject: format!("{sender_name} - {subject}"),
        text_body: text,
        html_body: html,
    })
}

/// Compose the confirmation of an accepted format choice.
///
/// # Errors
///
/// Returns an error if a template fails to render.
pub fn format_choice_confirmation(
    customer: &Customer,
    sender_name: &str,
    choices: &[FormatChoice],
    address: &PostalAddress,
) -> Result<OutgoingEmail, askama::Error> {
    let greeting = customer.greeting_name();
    let lines = recap(customer, choices);
    let address = address_lines(address);

    let html = FormatChoiceHtml {
        greeting,
        sender_name,
        lines: &lines,
        address: &address,
    }
    .render()?;
    let text = FormatChoiceText {
        greeting,
        sender_name,
        lines: &lines,
        address: &address,
    }
    .render()?;

    Ok(OutgoingEmail {
        to: customer.email.clone(),
        to_name: customer.display_name(),
        subject: format!("{sender_name} - Confirmation de votre choix de format"),
        text_body: text,
        html_body: html,
    })
}

/// Compose the confirmation of an accepted refund request.
///
/// # Errors
///
/// Returns an error if a template fails to render.
pub fn refund_confirmation(
    customer: &Customer,
    sender_name: &str,
    amount: Amount,
    address: &PostalAddress,
    iban: &Iban,
    bic: &Bic,
) -> Result<OutgoingEmail, askama::Error> {
    let greeting = customer.greeting_name();
    let address = address_lines(address);
    let iban = iban.grouped();

    let html = RefundHtml {
        greeting,
        sender_name,
        amount: amount.rounded(),
        address: &address,
        iban: &iban,
        bic: bic.as_str(),
    }
    .render()?;
    let text = RefundText {
        greeting,
        sender_name,
        amount: amount.rounded(),
        address: &address,
        iban: &iban,
        bic: bic.as_str(),
    }
    .render()?;

    Ok(OutgoingEmail {
        to: customer.email.clone(),
        to_name: customer.display_name(),
        subject: format!("{sender_name} - Confirmation de votre demande de remboursement"),
        text_body: text,
        html_body: html,
    })
}

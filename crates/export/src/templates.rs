//! The template catalog.
//!
//! Templates are static, code-embedded data: for each
//! `(export type, template name)` pair, the ordered column descriptors,
//! the single-file record ceiling, and the recommended chunk size.
//! Unknown pairs are a validation error; a template that declared no
//! ceiling would fall under [`GLOBAL_SINGLE_FILE_CAP`], though every
//! shipped template declares its own.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::transform::{ColumnDescriptor, TransformKind, col};

/// Hard ceiling applied when a template does not declare its own.
pub const GLOBAL_SINGLE_FILE_CAP: u64 = 25_000;

/// The data sets the service knows how to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportType {
    /// Event participants.
    Participants,
    /// Payment records.
    Payments,
    /// Ambassadors.
    Ambassadors,
}

impl ExportType {
    /// All known export types.
    pub const ALL: [ExportType; 3] = [
        ExportType::Participants,
        ExportType::Payments,
        ExportType::Ambassadors,
    ];

    /// The lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportType::Participants => "participants",
            ExportType::Payments => "payments",
            ExportType::Ambassadors => "ambassadors",
        }
    }

    /// A capitalized label for sheet names and UI strings.
    pub fn label(&self) -> &'static str {
        match self {
            ExportType::Participants => "Participants",
            ExportType::Payments => "Payments",
            ExportType::Ambassadors => "Ambassadors",
        }
    }
}

impl fmt::Display for ExportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "participants" => Ok(ExportType::Participants),
            "payments" => Ok(ExportType::Payments),
            "ambassadors" => Ok(ExportType::Ambassadors),
            _ => Err(format!(
                "unknown export type '{}'; valid types: participants, payments, ambassadors",
                s
            )),
        }
    }
}

/// A named, ordered field projection with its limits.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    /// The export type this template belongs to.
    pub export_type: ExportType,
    /// The template name callers select.
    pub name: &'static str,
    /// Ordered column descriptors.
    pub columns: &'static [ColumnDescriptor],
    /// Maximum records emitted as a single file.
    pub max_records_single_file: u64,
    /// Chunk size used when the export goes multi-file.
    pub recommended_chunk_size: u64,
    /// Whether the field set carries personal or payment detail beyond
    /// the standard projection.
    pub includes_sensitive: bool,
}

impl Template {
    /// The header labels in column order.
    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.header.to_string()).collect()
    }
}

/// Looks up a template by export type and name.
pub fn lookup(export_type: ExportType, name: &str) -> Option<&'static Template> {
    templates_for(export_type).iter().find(|t| t.name == name)
}

/// All templates registered for an export type.
pub fn templates_for(export_type: ExportType) -> &'static [Template] {
    match export_type {
        ExportType::Participants => &PARTICIPANT_TEMPLATES,
        ExportType::Payments => &PAYMENT_TEMPLATES,
        ExportType::Ambassadors => &AMBASSADOR_TEMPLATES,
    }
}

const PHONE: TransformKind = TransformKind::PhoneConcat {
    code_field: "phone_country_code",
};
const AMBASSADOR_NAME: TransformKind = TransformKind::JoinLookup {
    path: &["ambassador", "name"],
};

static PARTICIPANTS_STANDARD: [ColumnDescriptor; 10] = [
    col("id", "ID", TransformKind::Passthrough),
    col("full_name", "Full Name", TransformKind::Passthrough),
    col("email", "Email", TransformKind::Passthrough),
    col("country", "Country", TransformKind::Passthrough),
    col("institution", "Institution", TransformKind::Passthrough),
    col("phone_number", "Phone", PHONE),
    col("category", "Category", TransformKind::Passthrough),
    col("form_status", "Form Status", TransformKind::StatusMap),
    col("payment_status", "Payment Status", TransformKind::PaymentStatusMap),
    col("registration_date", "Registration Date", TransformKind::DateIso),
];

static PARTICIPANTS_DETAILED: [ColumnDescriptor; 18] = [
    col("id", "ID", TransformKind::Passthrough),
    col("full_name", "Full Name", TransformKind::Passthrough),
    col("email", "Email", TransformKind::Passthrough),
    col("gender", "Gender", TransformKind::Passthrough),
    col("birth_date", "Birth Date", TransformKind::DateIso),
    col("country", "Country", TransformKind::Passthrough),
    col("nationality", "Nationality", TransformKind::Passthrough),
    col("institution", "Institution", TransformKind::Passthrough),
    col("education_level", "Education Level", TransformKind::Passthrough),
    col("major", "Major", TransformKind::Passthrough),
    col("phone_number", "Phone", PHONE),
    col("emergency_contact", "Emergency Contact", TransformKind::Passthrough),
    col("category", "Category", TransformKind::Passthrough),
    col("form_status", "Form Status", TransformKind::StatusMap),
    col("payment_status", "Payment Status", TransformKind::PaymentStatusMap),
    col("ambassador", "Ambassador", AMBASSADOR_NAME),
    col("registration_date", "Registration Date", TransformKind::DateIso),
    col("updated_at", "Last Updated", TransformKind::DateIso),
];

static PARTICIPANTS_SUMMARY: [ColumnDescriptor; 5] = [
    col("full_name", "Full Name", TransformKind::Passthrough),
    col("email", "Email", TransformKind::Passthrough),
    col("country", "Country", TransformKind::Passthrough),
    col("category", "Category", TransformKind::Passthrough),
    col("form_status", "Status", TransformKind::StatusMap),
];

static PARTICIPANTS_COMPLETE: [ColumnDescriptor; 36] = [
    col("id", "ID", TransformKind::Passthrough),
    col("full_name", "Full Name", TransformKind::Passthrough),
    col("first_name", "First Name", TransformKind::Passthrough),
    col("last_name", "Last Name", TransformKind::Passthrough),
    col("email", "Email", TransformKind::Passthrough),
    col("gender", "Gender", TransformKind::Passthrough),
    col("birth_date", "Birth Date", TransformKind::DateIso),
    col("birth_place", "Birth Place", TransformKind::Passthrough),
    col("nationality", "Nationality", TransformKind::Passthrough),
    col("country", "Country", TransformKind::Passthrough),
    col("state_province", "State/Province", TransformKind::Passthrough),
    col("city", "City", TransformKind::Passthrough),
    col("address", "Address", TransformKind::Passthrough),
    col("postal_code", "Postal Code", TransformKind::Passthrough),
    col("institution", "Institution", TransformKind::Passthrough),
    col("education_level", "Education Level", TransformKind::Passthrough),
    col("major", "Major", TransformKind::Passthrough),
    col("graduation_year", "Graduation Year", TransformKind::Passthrough),
    col("organization", "Organization", TransformKind::Passthrough),
    col("phone_number", "Phone", PHONE),
    col("emergency_contact_name", "Emergency Contact Name", TransformKind::Passthrough),
    col("emergency_contact_phone", "Emergency Contact Phone", TransformKind::Passthrough),
    col("category", "Category", TransformKind::DefaultIfAbsent { default: "General" }),
    col("experience_level", "Experience Level", TransformKind::Passthrough),
    col("motivation", "Motivation", TransformKind::Passthrough),
    col("expectations", "Expectations", TransformKind::Passthrough),
    col("dietary_restrictions", "Dietary Restrictions", TransformKind::Passthrough),
    col("t_shirt_size", "T-Shirt Size", TransformKind::Passthrough),
    col("special_needs", "Special Needs", TransformKind::Passthrough),
    col("referral_source", "Referral Source", TransformKind::Passthrough),
    col("ambassador", "Ambassador", AMBASSADOR_NAME),
    col("form_status", "Form Status", TransformKind::StatusMap),
    col("payment_status", "Payment Status", TransformKind::PaymentStatusMap),
    col("is_confirmed", "Confirmed", TransformKind::BooleanYesNo),
    col("registration_date", "Registration Date", TransformKind::DateIso),
    col("updated_at", "Last Updated", TransformKind::DateIso),
];

static PAYMENTS_STANDARD: [ColumnDescriptor; 8] = [
    col("id", "ID", TransformKind::Passthrough),
    col("participant_id", "Participant ID", TransformKind::Passthrough),
    col("amount", "Amount", TransformKind::Currency { symbol: None }),
    col("currency", "Currency", TransformKind::Passthrough),
    col("method", "Method", TransformKind::Passthrough),
    col("status", "Status", TransformKind::PaymentStatusMap),
    col("paid_at", "Paid At", TransformKind::DateIso),
    col("transaction_ref", "Transaction Ref", TransformKind::Passthrough),
];

static PAYMENTS_DETAILED: [ColumnDescriptor; 11] = [
    col("id", "ID", TransformKind::Passthrough),
    col("participant_id", "Participant ID", TransformKind::Passthrough),
    col("amount", "Amount", TransformKind::Currency { symbol: None }),
    col("currency", "Currency", TransformKind::Passthrough),
    col("usd_amount", "USD Amount", TransformKind::Currency { symbol: Some("$") }),
    col("method", "Method", TransformKind::Passthrough),
    col("gateway", "Gateway", TransformKind::Passthrough),
    col("status", "Status", TransformKind::PaymentStatusMap),
    col("paid_at", "Paid At", TransformKind::DateIso),
    col("transaction_ref", "Transaction Ref", TransformKind::Passthrough),
    col("notes", "Notes", TransformKind::Passthrough),
];

static AMBASSADORS_STANDARD: [ColumnDescriptor; 7] = [
    col("id", "ID", TransformKind::Passthrough),
    col("name", "Name", TransformKind::Passthrough),
    col("email", "Email", TransformKind::Passthrough),
    col("country", "Country", TransformKind::Passthrough),
    col("referral_code", "Referral Code", TransformKind::Passthrough),
    col("participants_referred", "Participants Referred", TransformKind::Passthrough),
    col("created_at", "Created At", TransformKind::DateIso),
];

static AMBASSADORS_DETAILED: [ColumnDescriptor; 10] = [
    col("id", "ID", TransformKind::Passthrough),
    col("name", "Name", TransformKind::Passthrough),
    col("email", "Email", TransformKind::Passthrough),
    col("country", "Country", TransformKind::Passthrough),
    col("phone_number", "Phone", PHONE),
    col("institution", "Institution", TransformKind::Passthrough),
    col("referral_code", "Referral Code", TransformKind::Passthrough),
    col("participants_referred", "Participants Referred", TransformKind::Passthrough),
    col("is_active", "Active", TransformKind::BooleanYesNo),
    col("created_at", "Created At", TransformKind::DateIso),
];

static PARTICIPANT_TEMPLATES: [Template; 4] = [
    Template {
        export_type: ExportType::Participants,
        name: "standard",
        columns: &PARTICIPANTS_STANDARD,
        max_records_single_file: 15_000,
        recommended_chunk_size: 5_000,
        includes_sensitive: false,
    },
    Template {
        export_type: ExportType::Participants,
        name: "detailed",
        columns: &PARTICIPANTS_DETAILED,
        max_records_single_file: 10_000,
        recommended_chunk_size: 3_000,
        includes_sensitive: true,
    },
    Template {
        export_type: ExportType::Participants,
        name: "summary",
        columns: &PARTICIPANTS_SUMMARY,
        max_records_single_file: 50_000,
        recommended_chunk_size: 10_000,
        includes_sensitive: false,
    },
    Template {
        export_type: ExportType::Participants,
        name: "complete",
        columns: &PARTICIPANTS_COMPLETE,
        max_records_single_file: 5_000,
        recommended_chunk_size: 2_000,
        includes_sensitive: true,
    },
];

static PAYMENT_TEMPLATES: [Template; 2] = [
    Template {
        export_type: ExportType::Payments,
        name: "standard",
        columns: &PAYMENTS_STANDARD,
        max_records_single_file: 15_000,
        recommended_chunk_size: 5_000,
        includes_sensitive: false,
    },
    Template {
        export_type: ExportType::Payments,
        name: "detailed",
        columns: &PAYMENTS_DETAILED,
        max_records_single_file: 10_000,
        recommended_chunk_size: 3_000,
        includes_sensitive: true,
    },
];

static AMBASSADOR_TEMPLATES: [Template; 2] = [
    Template {
        export_type: ExportType::Ambassadors,
        name: "standard",
        columns: &AMBASSADORS_STANDARD,
        max_records_single_file: 15_000,
        recommended_chunk_size: 5_000,
        includes_sensitive: false,
    },
    Template {
        export_type: ExportType::Ambassadors,
        name: "detailed",
        columns: &AMBASSADORS_DETAILED,
        max_records_single_file: 10_000,
        recommended_chunk_size: 3_000,
        includes_sensitive: true,
    },
];

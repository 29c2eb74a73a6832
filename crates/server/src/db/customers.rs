//! Customer ledger queries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use boxset_core::{
    Amount, CustomerId, Email, FormatChoice, PackCounts, PackLine, PhysicalFormat, PostalAddress,
};

use super::{CustomerLedger, PgStore, RepositoryError};
use crate::models::{Customer, NewCustomer};

const CUSTOMER_COLUMNS: &str = r"
    id, first_name, last_name, email, melancolie, symphonie,
    address_line1, address_line2, postal_code, city, country,
    iban, bic, refund_requested, refund_requested_at, refund_amount,
    format_choice_completed, format_choice_completed_at
";

/// Internal row type for customer queries.
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    first_name: Option<String>,
    last_name: Option<String>,
    email: String,
    melancolie: i32,
    symphonie: i32,
    address_line1: Option<String>,
    address_line2: Option<String>,
    postal_code: Option<String>,
    city: Option<String>,
    country: Option<String>,
    iban: Option<String>,
    bic: Option<String>,
    refund_requested: bool,
    refund_requested_at: Option<DateTime<Utc>>,
    refund_amount: Option<Decimal>,
    format_choice_completed: bool,
    format_choice_completed_at: Option<DateTime<Utc>>,
}

fn pack_count(value: i32, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::DataCorruption(format!("negative {column} count in database: {value}"))
    })
}

impl TryFrom<CustomerRow> for Customer {
    type Error = RepositoryError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let packs = PackCounts::new(
            pack_count(row.melancolie, "melancolie")?,
            pack_count(row.symphonie, "symphonie")?,
        );

        Ok(Self {
            id: CustomerId::new(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            email,
            packs,
            address: PostalAddress {
                line1: row.address_line1.unwrap_or_default(),
                line2: row.address_line2,
                postal_code: row.postal_code.unwrap_or_default(),
                city: row.city.unwrap_or_default(),
                country: row.country.unwrap_or_default(),
            },
            iban: row.iban,
            bic: row.bic,
            refund_requested: row.refund_requested,
            refund_requested_at: row.refund_requested_at,
            refund_amount: row.refund_amount.map(Amount::new),
            format_choice_completed: row.format_choice_completed,
            format_choice_completed_at: row.format_choice_completed_at,
        })
    }
}

/// Internal row type for format choice queries.
#[derive(Debug, sqlx::FromRow)]
struct FormatChoiceRow {
    pack_line: String,
    format: String,
    quantity: i32,
}

impl TryFrom<FormatChoiceRow> for FormatChoice {
    type Error = RepositoryError;

    fn try_from(row: FormatChoiceRow) -> Result<Self, Self::Error> {
        let pack_line: PackLine = row
            .pack_line
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("format_choice: {e}")))?;
        let format: PhysicalFormat = row
            .format
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("format_choice: {e}")))?;

        Ok(Self {
            pack_line,
            format,
            quantity: pack_count(row.quantity, "quantity")?,
        })
    }
}

impl CustomerLedger for PgStore {
    async fn find_customer_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM boxset.customer WHERE email = $1 ORDER BY id LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM boxset.customer WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_format_choices(
        &self,
        id: CustomerId,
    ) -> Result<Vec<FormatChoice>, RepositoryError> {
        let rows = sqlx::query_as::<_, FormatChoiceRow>(
            r"
            SELECT pack_line, format, quantity
            FROM boxset.format_choice
            WHERE customer_id = $1
            ORDER BY pack_line, format
            ",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_customers_with_packs(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM boxset.customer \
             WHERE melancolie > 0 OR symphonie > 0 ORDER BY id"
        ))
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(self.pool()).await?;
        Ok(())
    }
}

impl PgStore {
    /// Register a customer in the ledger.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_customer(
        &self,
        customer: NewCustomer,
    ) -> Result<Customer, RepositoryError> {
        let melancolie = i32::try_from(customer.packs.melancolie)
            .map_err(|_| RepositoryError::DataCorruption("melancolie count too large".into()))?;
        let symphonie = i32::try_from(customer.packs.symphonie)
            .map_err(|_| RepositoryError::DataCorruption("symphonie count too large".into()))?;

        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "INSERT INTO boxset.customer (email, first_name, last_name, melancolie, symphonie) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(&customer.email)
        .bind(customer.first_name)
        .bind(customer.last_name)
        .bind(melancolie)
        .bind(symphonie)
        .fetch_one(self.pool())
        .await?;

        row.try_into()
    }
}

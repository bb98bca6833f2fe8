//! Customer entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use bms_core::status::{CustomerStatus, CustomerType};
use bms_core::types::{DbId, Timestamp};

use crate::criteria::{BindValue, Criteria, CriteriaBuilder};

/// Full customer row from the `customers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Customer {
    pub id: DbId,
    pub name: String,
    pub company: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: String,
    #[sqlx(try_from = "String")]
    pub customer_type: CustomerType,
    #[sqlx(try_from = "String")]
    pub status: CustomerStatus,
    pub newsletter: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new customer.
///
/// `country`, `customer_type`, `status`, and `newsletter` default in the
/// insert (Deutschland / PRIVATE / ACTIVE / false) when unset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCustomer {
    pub name: String,
    pub company: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub status: Option<CustomerStatus>,
    pub newsletter: Option<bool>,
}

/// DTO for updating an existing customer. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCustomer {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub status: Option<CustomerStatus>,
    pub newsletter: Option<bool>,
}

/// Filter parameters for customer queries.
///
/// Soft-deleted customers are excluded unless the filter asks for a status
/// explicitly or sets `include_deleted`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerFilter {
    /// Case-insensitive contains over name/company/email/phone/city.
    pub search: Option<String>,
    pub status: Option<CustomerStatus>,
    pub customer_type: Option<CustomerType>,
    pub newsletter: Option<bool>,
    #[serde(default)]
    pub include_deleted: bool,
}

impl CriteriaBuilder for CustomerFilter {
    fn build(&self) -> Criteria {
        let mut criteria = Criteria::new();
        if let Some(ref term) = self.search {
            criteria.contains_any(&["name", "company", "email", "phone", "city"], term);
        }
        match self.status {
            Some(status) => {
                criteria.eq("status", BindValue::Text(status.as_str().to_string()));
            }
            None if !self.include_deleted => {
                criteria.raw("status <> 'DELETED'");
            }
            None => {}
        }
        if let Some(customer_type) = self.customer_type {
            criteria.eq(
                "customer_type",
                BindValue::Text(customer_type.as_str().to_string()),
            );
        }
        if let Some(newsletter) = self.newsletter {
            criteria.eq("newsletter", BindValue::Bool(newsletter));
        }
        criteria
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_excludes_deleted() {
        let criteria = CustomerFilter::default().build();
        assert_eq!(criteria.where_clause(), "WHERE status <> 'DELETED'");
    }

    #[test]
    fn explicit_status_overrides_deleted_exclusion() {
        let filter = CustomerFilter {
            status: Some(CustomerStatus::Deleted),
            ..Default::default()
        };
        assert_eq!(filter.build().where_clause(), "WHERE status = $1");
    }

    #[test]
    fn include_deleted_drops_the_exclusion() {
        let filter = CustomerFilter {
            include_deleted: true,
            newsletter: Some(true),
            ..Default::default()
        };
        assert_eq!(filter.build().where_clause(), "WHERE newsletter = $1");
    }

    #[test]
    fn search_fans_out_over_contact_columns() {
        let filter = CustomerFilter {
            search: Some("doe".to_string()),
            ..Default::default()
        };
        let clause = filter.build().where_clause();
        assert!(clause.contains("name ILIKE $1"));
        assert!(clause.contains("city ILIKE $1"));
        assert!(clause.contains("status <> 'DELETED'"));
    }
}

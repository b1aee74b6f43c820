//! Catalog service errors and their HTTP status mapping.

use halnav::status::ExceptionStatusAndLoggingStrategy;
use halnav::HalError;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Product {0} not found")]
    ProductNotFound(u32),

    #[error("Invalid product id '{0}'")]
    InvalidProductId(String),

    #[error("No resource at {0}")]
    UnknownPath(String),
}

impl From<CatalogError> for HalError {
    fn from(error: CatalogError) -> Self {
        HalError::resource(error)
    }
}

/// Maps [`CatalogError`]s raised by resources to 4xx responses.
#[derive(Debug, Default, Clone, Copy)]
pub struct CatalogExceptionStrategy;

impl ExceptionStatusAndLoggingStrategy for CatalogExceptionStrategy {
    fn name(&self) -> &'static str {
        "catalog"
    }

    fn extract_status_code(&self, error: &HalError) -> Option<u16> {
        error.downcast_ref::<CatalogError>().map(|e| match e {
            CatalogError::ProductNotFound(_) | CatalogError::UnknownPath(_) => 404,
            CatalogError::InvalidProductId(_) => 400,
        })
    }

    // Expected client mistakes, no stack of causes needed in the logs.
    fn is_compact_logging(&self, error: &HalError) -> Option<bool> {
        error.downcast_ref::<CatalogError>().map(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use halnav::status::CompositeExceptionStrategy;

    #[test]
    fn test_catalog_errors_map_to_client_statuses() {
        let mut strategy = CompositeExceptionStrategy::with_default_strategies();
        strategy.register(std::sync::Arc::new(CatalogExceptionStrategy));

        assert_eq!(strategy.status_code(&CatalogError::ProductNotFound(9).into()), 404);
        assert_eq!(
            strategy.status_code(&CatalogError::InvalidProductId("x".into()).into()),
            400
        );
        assert!(strategy.compact_logging(&CatalogError::UnknownPath("/x".into()).into()));
        assert_eq!(strategy.status_code(&HalError::developer("bug")), 500);
    }
}

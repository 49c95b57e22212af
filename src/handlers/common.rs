use crate::errors::ServiceError;
use crate::{ApiResponse, ResponseMeta};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

const DEFAULT_PAGE_SIZE: u64 = 10;
const MAX_PAGE_SIZE: u64 = 100;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {}", e)))
}

/// Unwraps a JSON body, turning every rejection into a 400.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ServiceError::BadRequest(rejection.body_text()))
}

/// `page` starts at 1; `page_size` and its alias `limit` take 1..=100.
#[derive(Clone, Copy, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub limit: Option<u64>,
}

impl ListParams {
    /// Returns `(page, page_size)` or rejects out-of-range values.
    pub fn resolve(&self) -> Result<(u64, u64), ServiceError> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(ServiceError::BadRequest("page must be at least 1".into()));
        }
        let size = self.page_size.or(self.limit).unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&size) {
            return Err(ServiceError::BadRequest(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok((page, size))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Pagination {
    pub current_page: u64,
    pub page_size: u64,
    pub total_records: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(current_page: u64, page_size: u64, total_records: u64) -> Self {
        let total_pages = if total_records == 0 {
            0
        } else {
            (total_records + page_size - 1) / page_size
        };
        Self {
            current_page,
            page_size,
            total_records,
            total_pages,
            has_next: current_page < total_pages,
            has_prev: current_page > 1,
        }
    }
}

/// Standard paginated response wrapper
#[derive(Serialize, ToSchema)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
    pub meta: ResponseMeta,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(data: Vec<T>, page: u64, page_size: u64, total: u64) -> Self {
        Self {
            data,
            pagination: Pagination::new(page, page_size, total),
            meta: ResponseMeta::capture(),
        }
    }
}

impl<T: Serialize> IntoResponse for Paginated<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, None, (1, 10))]
    #[case(Some(3), Some(25), None, (3, 25))]
    #[case(Some(2), None, Some(50), (2, 50))]
    #[case(Some(1), Some(100), Some(5), (1, 100))]
    fn resolves_page_and_size(
        #[case] page: Option<u64>,
        #[case] page_size: Option<u64>,
        #[case] limit: Option<u64>,
        #[case] expected: (u64, u64),
    ) {
        let params = ListParams {
            page,
            page_size,
            limit,
        };
        assert_eq!(params.resolve().unwrap(), expected);
    }

    #[rstest]
    #[case(Some(0), None, None)]
    #[case(None, Some(0), None)]
    #[case(None, Some(101), None)]
    #[case(None, None, Some(500))]
    fn rejects_out_of_range(
        #[case] page: Option<u64>,
        #[case] page_size: Option<u64>,
        #[case] limit: Option<u64>,
    ) {
        let params = ListParams {
            page,
            page_size,
            limit,
        };
        assert_matches!(params.resolve(), Err(ServiceError::BadRequest(_)));
    }

    #[test]
    fn pagination_flags() {
        let p = Pagination::new(1, 10, 25);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(!p.has_prev);

        let last = Pagination::new(3, 10, 25);
        assert!(!last.has_next);
        assert!(last.has_prev);

        let empty = Pagination::new(1, 10, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
    }
}

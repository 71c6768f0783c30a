use super::ApiError;
use crate::db::TicketFilter;
use crate::entities::repairs::RepairStatus;

pub fn validate_id(id: i32, resource: &str) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {} ID: {}. ID must be a positive integer",
            resource, id
        )));
    }
    Ok(id)
}

/// Parses a `status` query value. `None` yields `default`.
pub fn parse_status_filter(
    value: Option<&str>,
    default: TicketFilter,
) -> Result<TicketFilter, ApiError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };

    if value == "all" {
        return Ok(TicketFilter::All);
    }

    RepairStatus::parse(value)
        .map(TicketFilter::Status)
        .ok_or_else(|| ApiError::validation(format!("Unknown ticket status: {}", value)))
}

pub fn filter_label(filter: TicketFilter) -> String {
    match filter {
        TicketFilter::All => "all".to_string(),
        TicketFilter::Status(status) => status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id(1, "Ticket").is_ok());
        assert!(validate_id(0, "Ticket").is_err());
        assert!(validate_id(-3, "Dormitory").is_err());
    }

    #[test]
    fn test_parse_status_filter() {
        let pending = TicketFilter::Status(RepairStatus::Pending);

        assert_eq!(parse_status_filter(None, pending).unwrap(), pending);
        assert_eq!(parse_status_filter(Some(""), TicketFilter::All).unwrap(), TicketFilter::All);
        assert_eq!(parse_status_filter(Some("all"), pending).unwrap(), TicketFilter::All);
        assert_eq!(
            parse_status_filter(Some("in_progress"), TicketFilter::All).unwrap(),
            TicketFilter::Status(RepairStatus::InProgress)
        );
        assert!(parse_status_filter(Some("done"), TicketFilter::All).is_err());
    }

    #[test]
    fn test_filter_label() {
        assert_eq!(filter_label(TicketFilter::All), "all");
        assert_eq!(
            filter_label(TicketFilter::Status(RepairStatus::Completed)),
            "completed"
        );
    }
}

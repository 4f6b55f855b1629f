use crate::server::response::ApiError;

const MAX_EMAIL_LEN: usize = 254;
const MAX_DISPLAY_NAME_LEN: usize = 80;
const MAX_TITLE_LEN: usize = 200;
const MIN_PASSWORD_LEN: usize = 8;

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    // Deliverability is the mail server's problem; this only rejects
    // obvious garbage.
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ApiError::bad_request("Invalid email address"));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_display_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::bad_request("Display name cannot be empty"));
    }
    if name.len() > MAX_DISPLAY_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Display name cannot exceed {MAX_DISPLAY_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::bad_request("Title cannot be empty"));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(ApiError::bad_request(format!(
            "Title cannot exceed {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_price_cents(price_cents: i64) -> Result<(), ApiError> {
    if price_cents < 0 {
        return Err(ApiError::bad_request("Price cannot be negative"));
    }
    Ok(())
}

pub fn validate_free_chapters(free_chapters: i64) -> Result<(), ApiError> {
    if free_chapters < 0 {
        return Err(ApiError::bad_request("Free chapter count cannot be negative"));
    }
    Ok(())
}

pub fn validate_chapter_number(number: i64) -> Result<(), ApiError> {
    if number < 1 {
        return Err(ApiError::bad_request("Chapter number must be positive"));
    }
    Ok(())
}

pub fn validate_rating(rating: i64) -> Result<(), ApiError> {
    if !(1..=5).contains(&rating) {
        return Err(ApiError::bad_request("Rating must be between 1 and 5"));
    }
    Ok(())
}

pub fn validate_progress_percentage(pct: i64) -> Result<(), ApiError> {
    if !(0..=100).contains(&pct) {
        return Err(ApiError::bad_request(
            "Progress percentage must be between 0 and 100",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(validate_email("reader@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@nodot").is_err());
    }

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn chapter_number_must_be_positive() {
        assert!(validate_chapter_number(1).is_ok());
        assert!(validate_chapter_number(0).is_err());
        assert!(validate_chapter_number(-3).is_err());
    }
}

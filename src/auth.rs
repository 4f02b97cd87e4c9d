use super::{
    errors::{NotesError, Result},
    models::{LoginForm, SignupForm, User},
    service::NotesService,
    session,
    session::Session,
};
use tracing::info;

/// Exchange credentials for a session. The service's credential is kept in
/// the session so later requests can present it.
pub async fn authenticate(
    service: &dyn NotesService,
    form: &LoginForm,
) -> Result<Session> {
    if form.email.trim().is_empty() || form.password.is_empty() {
        return Err(NotesError::Validation(
            "Email and password are required".into(),
        ));
    }
    let response = service.login(form).await?;
    let user = response.user.unwrap_or_else(|| User {
        name: String::new(),
        email: form.email.trim().to_string(),
    });
    info!(email = %user.email, "logged in");
    Ok(Session {
        user,
        token: response.token,
        created_at: session::now(),
    })
}

pub async fn register(service: &dyn NotesService, form: &SignupForm) -> Result<()> {
    if form.name.trim().is_empty()
        || form.email.trim().is_empty()
        || form.password.is_empty()
    {
        return Err(NotesError::Validation("All fields are required".into()));
    }
    service.signup(form).await
}

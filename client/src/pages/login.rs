//! Role login pages (`/admin/login`, `/candidat/login`).
//!
//! SYSTEM CONTEXT
//! ==============
//! Credentials are checked by the recruitment backend. On success the page
//! persists the session through `AuthStore::store_login`, which also clears
//! whatever the other role had cached, then refreshes the auth signal; the
//! already-signed-in effect takes it from there to the dashboard.

#[cfg(test)]
#[path = "login_test.rs"]
mod login_test;

use leptos::prelude::*;
use leptos_router::NavigateOptions;
use leptos_router::hooks::use_navigate;
use sessions::UserRole;

use crate::config::ClientConfig;
use crate::state::auth::AuthState;

const MISSING_FIELDS: &str = "Enter both email and password.";
const INVALID_EMAIL: &str = "Enter a valid email address.";

/// Trim and check the form fields before calling the backend.
pub(crate) fn validate_login_input(email: &str, password: &str) -> Result<(String, String), &'static str> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(MISSING_FIELDS);
    }
    if !looks_like_email(email) {
        return Err(INVALID_EMAIL);
    }
    Ok((email.to_owned(), password.to_owned()))
}

fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

pub(crate) fn login_title(role: UserRole) -> &'static str {
    match role {
        UserRole::Admin => "Administrator sign-in",
        UserRole::Candidate => "Candidate sign-in",
    }
}

#[component]
pub fn AdminLoginPage() -> impl IntoView {
    view! { <LoginForm role=UserRole::Admin/> }
}

#[component]
pub fn CandidateLoginPage() -> impl IntoView {
    view! { <LoginForm role=UserRole::Candidate/> }
}

#[component]
fn LoginForm(role: UserRole) -> impl IntoView {
    let auth = expect_context::<RwSignal<AuthState>>();
    let config = expect_context::<ClientConfig>();
    let navigate = use_navigate();

    let email = RwSignal::new(String::new());
    let password = RwSignal::new(String::new());
    let info = RwSignal::new(String::new());
    let busy = RwSignal::new(false);

    Effect::new(move || {
        if auth.get().role() == Some(role) {
            navigate(role.home_route(), NavigateOptions::default());
        }
    });

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        if busy.get() {
            return;
        }
        let (email_value, password_value) = match validate_login_input(&email.get(), &password.get()) {
            Ok(fields) => fields,
            Err(message) => {
                info.set(message.to_owned());
                return;
            }
        };
        busy.set(true);
        info.set("Signing in...".to_owned());

        #[cfg(feature = "hydrate")]
        {
            let base = config.api_base_url.clone();
            leptos::task::spawn_local(async move {
                match crate::net::api::login(&base, role, &email_value, &password_value).await {
                    Ok(session) => {
                        let store = sessions::AuthStore::new(crate::util::storage::BrowserStore::local());
                        match store.store_login(&session) {
                            Ok(()) => {
                                info.set(String::new());
                                auth.set(AuthState::from_store(&store));
                            }
                            Err(e) => info.set(format!("Could not save session: {e}")),
                        }
                    }
                    Err(e) => info.set(e),
                }
                busy.set(false);
            });
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = (email_value, password_value, &config);
        }
    };

    view! {
        <div class="login-page">
            <div class="login-card">
                <h1>{login_title(role)}</h1>
                <form class="login-form" on:submit=on_submit>
                    <input
                        class="login-input"
                        type="email"
                        placeholder="you@example.com"
                        prop:value=move || email.get()
                        on:input=move |ev| email.set(event_target_value(&ev))
                    />
                    <input
                        class="login-input"
                        type="password"
                        placeholder="Password"
                        prop:value=move || password.get()
                        on:input=move |ev| password.set(event_target_value(&ev))
                    />
                    <button class="login-button" type="submit" disabled=move || busy.get()>
                        "Sign in"
                    </button>
                </form>
                <Show when=move || !info.get().is_empty()>
                    <p class="login-message">{move || info.get()}</p>
                </Show>
                <a class="login-card__back" href="/">"Back to home"</a>
            </div>
        </div>
    }
}

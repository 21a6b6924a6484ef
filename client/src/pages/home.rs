//! Public landing page with entry points to both login routes.

use leptos::prelude::*;
use sessions::UserRole;

#[component]
pub fn HomePage() -> impl IntoView {
    view! {
        <div class="home-page">
            <h1>"Careers"</h1>
            <p class="home-page__subtitle">"Browse open positions and follow your applications."</p>
            <nav class="home-page__links">
                <a class="login-button" href=UserRole::Candidate.login_route()>"Candidate space"</a>
                <a class="login-button login-button--secondary" href=UserRole::Admin.login_route()>
                    "Administration"
                </a>
            </nav>
        </div>
    }
}

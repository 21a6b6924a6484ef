//! Root application component with routing and context providers.

use leptos::prelude::*;
use leptos_meta::{MetaTags, Stylesheet, Title, provide_meta_context};
use leptos_router::{
    StaticSegment,
    components::{Route, Router, Routes},
};

use crate::config::ClientConfig;
use crate::pages::dashboard::{AdminDashboardPage, CandidateDashboardPage};
use crate::pages::home::HomePage;
use crate::pages::login::{AdminLoginPage, CandidateLoginPage};
use crate::state::auth::{AuthState, load_from_browser};

/// HTML shell rendered on the server for SSR + hydration.
pub fn shell(options: LeptosOptions) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="fr">
            <head>
                <meta charset="utf-8"/>
                <meta name="viewport" content="width=device-width, initial-scale=1"/>
                <AutoReload options=options.clone()/>
                <HydrationScripts options/>
                <MetaTags/>
            </head>
            <body>
                <App/>
            </body>
        </html>
    }
}

/// Root application component.
///
/// Provides the auth snapshot and the build-time configuration, then sets up
/// client-side routing.
#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    let auth = RwSignal::new(AuthState::loading());
    provide_context(auth);
    provide_context(ClientConfig::from_build_env());

    // Effects only run in the browser, so SSR keeps rendering the loading state.
    Effect::new(move || auth.set(load_from_browser()));

    view! {
        <Stylesheet id="leptos" href="/pkg/client.css"/>
        <Title text="Careers"/>

        <Router>
            <Routes fallback=|| "Page not found.".into_view()>
                <Route path=StaticSegment("") view=HomePage/>
                <Route path=(StaticSegment("admin"), StaticSegment("login")) view=AdminLoginPage/>
                <Route path=(StaticSegment("candidat"), StaticSegment("login")) view=CandidateLoginPage/>
                <Route path=StaticSegment("admin") view=AdminDashboardPage/>
                <Route path=StaticSegment("candidat") view=CandidateDashboardPage/>
            </Routes>
        </Router>
    }
}

// src/handlers/pages.rs

use axum::response::Html;

// Destinos dos redirects para quem navega pelo browser.

pub async fn suspended_page() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>Account suspended</title></head><body>\
         <h1>This pharmacy account is suspended</h1>\
         <p>Please contact support to reinstate access.</p></body></html>",
    )
}

pub async fn subscription_page() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>Subscription required</title></head><body>\
         <h1>Your trial has ended</h1>\
         <p>Choose a plan to keep using the system.</p></body></html>",
    )
}

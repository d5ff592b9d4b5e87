//! Tracking pixels for TikTok, Meta (Facebook) and Google.
//!
//! Store settings list the pixels to load. Pages describe what happened
//! (`PixelEvent`) and this module renders one inline script that loads each
//! pixel and fires the events in every provider's own dialect.
//!
//! Tracking honours the `pixel-consent` cookie: no cookie means allowed,
//! `true` means allowed, anything else means denied.

use std::collections::HashSet;

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Value, json};
use tower_sessions::cookie::{Cookie, SameSite};

use crate::api::PixelConfig;

/// Name of the consent cookie.
pub const CONSENT_COOKIE: &str = "pixel-consent";

/// How long a consent choice is remembered (one year).
const CONSENT_MAX_AGE_DAYS: i64 = 365;

/// Hosts pixel loaders pull scripts from.
pub const PIXEL_SCRIPT_HOSTS: &[&str] = &[
    "https://analytics.tiktok.com",
    "https://connect.facebook.net",
    "https://www.googletagmanager.com",
];

/// Hosts pixels send events and load beacons from.
pub const PIXEL_CONNECT_HOSTS: &[&str] = &[
    "https://analytics.tiktok.com",
    "https://www.facebook.com",
    "https://connect.facebook.net",
    "https://www.google-analytics.com",
    "https://*.google-analytics.com",
    "https://www.googletagmanager.com",
];

/// A supported pixel vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelProvider {
    TikTok,
    Facebook,
    Google,
}

impl PixelProvider {
    /// Map the store setting's `type` to a provider.
    #[must_use]
    pub fn from_type(kind: &str) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "tiktok" => Some(Self::TikTok),
            "facebook" | "meta" => Some(Self::Facebook),
            "google" => Some(Self::Google),
            _ => None,
        }
    }
}

/// A pixel ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixel {
    pub provider: PixelProvider,
    pub id: String,
}

/// Build the pixels to load from store settings.
///
/// Unknown types and malformed IDs are skipped with a warning. Duplicate IDs
/// load once.
#[must_use]
pub fn pixels_from_settings(configs: &[PixelConfig]) -> Vec<Pixel> {
    let mut seen = HashSet::new();
    let mut pixels = Vec::new();

    for config in configs {
        let Some(provider) = PixelProvider::from_type(&config.kind) else {
            tracing::warn!(pixel_type = %config.kind, pixel_id = %config.id, "Skipping unsupported pixel type");
            continue;
        };
        let id = config.id.trim();
        let valid_id = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_id {
            tracing::warn!(pixel_id = %config.id, "Skipping pixel with malformed ID");
            continue;
        }
        if seen.insert(id.to_string()) {
            pixels.push(Pixel {
                provider,
                id: id.to_string(),
            });
        }
    }

    pixels
}

/// E-commerce parameters shared by product events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParams {
    /// Amount in the display currency.
    pub value: Decimal,
    pub currency: String,
    pub content_ids: Vec<String>,
}

impl EventParams {
    fn to_json(&self) -> Value {
        let value = self.value.round_dp(2).to_f64().unwrap_or_default();
        json!({
            "value": value,
            "currency": self.currency,
            "content_ids": self.content_ids,
            "content_type": "product",
        })
    }
}

/// Something worth telling the pixels about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelEvent {
    PageView { path: String },
    ViewContent(EventParams),
    AddToCart(EventParams),
    Purchase {
        params: EventParams,
        transaction_id: String,
    },
}

impl PixelEvent {
    /// Event name and parameters as `provider` expects them.
    fn for_provider(&self, provider: PixelProvider) -> (&'static str, Value) {
        match self {
            Self::PageView { path } => ("PageView", json!({ "page_path": path })),
            Self::ViewContent(params) => ("ViewContent", params.to_json()),
            Self::AddToCart(params) => ("AddToCart", params.to_json()),
            Self::Purchase {
                params,
                transaction_id,
            } => match provider {
                PixelProvider::TikTok => ("CompletePayment", params.to_json()),
                PixelProvider::Facebook => ("Purchase", params.to_json()),
                PixelProvider::Google => {
                    let mut value = params.to_json();
                    value["transaction_id"] = Value::String(transaction_id.clone());
                    ("purchase", value)
                }
            },
        }
    }
}

/// Serialize a value for embedding inside a `<script>` element.
fn script_json(value: &impl serde::Serialize) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

const TIKTOK_LOADER: &str = r#"!function(w,d,t){w.TiktokAnalyticsObject=t;var ttq=w[t]=w[t]||[];ttq.methods=["page","track","identify","instances","debug","on","off","once","ready","alias","group","enableCookie","disableCookie"];ttq.setAndDefer=function(t,e){t[e]=function(){t.push([e].concat(Array.prototype.slice.call(arguments,0)))}};for(var i=0;i<ttq.methods.length;i++)ttq.setAndDefer(ttq,ttq.methods[i]);ttq.instance=function(t){for(var e=ttq._i[t]||[],n=0;n<ttq.methods.length;n++)ttq.setAndDefer(e,ttq.methods[n]);return e};ttq.load=function(e,n){var i="https://analytics.tiktok.com/i18n/pixel/events.js";ttq._i=ttq._i||{},ttq._i[e]=[],ttq._i[e]._u=i,ttq._t=ttq._t||{},ttq._t[e]=+new Date,ttq._o=ttq._o||{},ttq._o[e]=n||{};var o=d.createElement("script");o.async=!0,o.src=i+"?sdkid="+e+"&lib="+t;var a=d.getElementsByTagName("script")[0];a.parentNode.insertBefore(o,a)}}(window,document,"ttq");"#;

const FACEBOOK_LOADER: &str = r"!function(f,b,e,v,n,t,s){if(f.fbq)return;n=f.fbq=function(){n.callMethod?n.callMethod.apply(n,arguments):n.queue.push(arguments)};if(!f._fbq)f._fbq=n;n.push=n;n.loaded=!0;n.version='2.0';n.queue=[];t=b.createElement(e);t.async=!0;t.src=v;s=b.getElementsByTagName(e)[0];s.parentNode.insertBefore(t,s)}(window,document,'script','https://connect.facebook.net/en_US/fbevents.js');";

const GOOGLE_LOADER: &str = "window.dataLayer=window.dataLayer||[];window.gtag=window.gtag||function(){dataLayer.push(arguments)};gtag('js',new Date());";

impl Pixel {
    fn loader(&self) -> String {
        let id = script_json(&self.id);
        match self.provider {
            PixelProvider::TikTok => format!("{TIKTOK_LOADER}\nttq.load({id});ttq.page();"),
            PixelProvider::Facebook => format!("{FACEBOOK_LOADER}\nfbq('init',{id});"),
            PixelProvider::Google => format!(
                "(function(d,i){{var s=d.createElement('script');s.async=true;s.src='https://www.googletagmanager.com/gtag/js?id='+encodeURIComponent(i);d.head.appendChild(s)}})(document,{id});\n{GOOGLE_LOADER}gtag('config',{id});"
            ),
        }
    }
}

fn track_call(provider: PixelProvider, event: &PixelEvent) -> String {
    let (name, params) = event.for_provider(provider);
    let name = script_json(&name);
    let params = script_json(&params);
    match provider {
        PixelProvider::TikTok => format!("ttq.track({name},{params});"),
        PixelProvider::Facebook => format!("fbq('track',{name},{params});"),
        PixelProvider::Google => format!("gtag('event',{name},{params});"),
    }
}

fn distinct_providers(pixels: &[Pixel]) -> Vec<PixelProvider> {
    let mut providers: Vec<PixelProvider> = Vec::new();
    for pixel in pixels {
        if !providers.contains(&pixel.provider) {
            providers.push(pixel.provider);
        }
    }
    providers
}

fn track_calls(pixels: &[Pixel], events: &[PixelEvent]) -> Vec<String> {
    let providers = distinct_providers(pixels);
    events
        .iter()
        .flat_map(|event| providers.iter().map(move |p| track_call(*p, event)))
        .collect()
}

/// Render the inline script that loads `pixels` and fires `events`.
///
/// Each provider receives each event once, however many of its pixels are
/// configured. Returns an empty string when there is nothing to load.
#[must_use]
pub fn render_script(pixels: &[Pixel], events: &[PixelEvent]) -> String {
    if pixels.is_empty() {
        return String::new();
    }

    let mut lines: Vec<String> = pixels.iter().map(Pixel::loader).collect();
    lines.extend(track_calls(pixels, events));
    lines.join("\n")
}

/// Render only the event calls, for fragments swapped into a page whose
/// loaders already ran.
#[must_use]
pub fn render_events(pixels: &[Pixel], events: &[PixelEvent]) -> String {
    track_calls(pixels, events).join("\n")
}

/// The visitor's recorded consent choice, if the cookie is set.
#[must_use]
pub fn consent_choice(headers: &HeaderMap) -> Option<bool> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse(value.to_string()))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == CONSENT_COOKIE)
        .map(|cookie| cookie.value() == "true")
}

/// Cookie recording the visitor's consent choice.
#[must_use]
pub fn consent_cookie(allowed: bool, secure: bool) -> Cookie<'static> {
    Cookie::build((CONSENT_COOKIE, if allowed { "true" } else { "false" }))
        .path("/")
        .max_age(tower_sessions::cookie::time::Duration::days(CONSENT_MAX_AGE_DAYS))
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn config(id: &str, kind: &str) -> PixelConfig {
        PixelConfig {
            id: id.to_string(),
            kind: kind.to_string(),
        }
    }

    fn params() -> EventParams {
        EventParams {
            value: "37.50".parse().unwrap(),
            currency: "SAR".to_string(),
            content_ids: vec!["7".to_string()],
        }
    }

    #[test]
    fn test_unknown_and_duplicate_pixels_are_skipped() {
        let pixels = pixels_from_settings(&[
            config("C4ABCDEFGHIJKLMNOPQR", "tiktok"),
            config("123", "snapchat"),
            config("123456", "facebook"),
            config("123456", "facebook"),
            config("bad id<script>", "google"),
        ]);
        assert_eq!(pixels.len(), 2);
        assert_eq!(pixels[0].provider, PixelProvider::TikTok);
        assert_eq!(pixels[1].provider, PixelProvider::Facebook);
    }

    #[test]
    fn test_purchase_names_per_provider() {
        let event = PixelEvent::Purchase {
            params: params(),
            transaction_id: "ORD-9".to_string(),
        };
        assert_eq!(event.for_provider(PixelProvider::TikTok).0, "CompletePayment");
        assert_eq!(event.for_provider(PixelProvider::Facebook).0, "Purchase");

        let (name, value) = event.for_provider(PixelProvider::Google);
        assert_eq!(name, "purchase");
        assert_eq!(value["transaction_id"], "ORD-9");
        assert_eq!(value["content_type"], "product");
        assert_eq!(value["currency"], "SAR");
        assert!((value["value"].as_f64().unwrap() - 37.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_render_script_fires_each_event_once_per_provider() {
        let pixels = vec![
            Pixel {
                provider: PixelProvider::Facebook,
                id: "111".to_string(),
            },
            Pixel {
                provider: PixelProvider::Facebook,
                id: "222".to_string(),
            },
        ];
        let script = render_script(&pixels, &[PixelEvent::AddToCart(params())]);
        assert_eq!(script.matches("fbq('init'").count(), 2);
        assert_eq!(script.matches(r#"fbq('track',"AddToCart""#).count(), 1);
    }

    #[test]
    fn test_render_events_skips_loaders() {
        let pixels = vec![Pixel {
            provider: PixelProvider::TikTok,
            id: "C4ABC".to_string(),
        }];
        let script = render_events(&pixels, &[PixelEvent::AddToCart(params())]);
        assert!(!script.contains("ttq.load"));
        assert!(script.starts_with(r#"ttq.track("AddToCart""#));
    }

    #[test]
    fn test_render_script_empty_without_pixels() {
        assert!(render_script(&[], &[PixelEvent::PageView { path: "/".to_string() }]).is_empty());
    }

    #[test]
    fn test_script_json_escapes_markup() {
        let rendered = script_json(&"</script><b>&");
        assert!(!rendered.contains('<'));
        assert!(!rendered.contains('&'));
        assert_eq!(rendered, r#""\u003c/script\u003e\u003cb\u003e\u0026""#);
    }

    #[test]
    fn test_consent_cookie_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(consent_choice(&headers), None);

        headers.insert(COOKIE, HeaderValue::from_static("souq_session=abc; pixel-consent=false"));
        assert_eq!(consent_choice(&headers), Some(false));

        headers.insert(COOKIE, HeaderValue::from_static("pixel-consent=true"));
        assert_eq!(consent_choice(&headers), Some(true));

        headers.insert(COOKIE, HeaderValue::from_static("pixel-consent=maybe"));
        assert_eq!(consent_choice(&headers), Some(false));
    }

    #[test]
    fn test_consent_cookie_attributes() {
        let cookie = consent_cookie(false, true).to_string();
        assert!(cookie.starts_with("pixel-consent=false"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Secure"));
    }
}

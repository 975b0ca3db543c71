use once_cell::sync::Lazy;
use serde::Deserialize;
use std::time::Duration;

static HTTP: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap_or_default()
});

#[derive(Deserialize)]
struct ReverseGeocode {
    locality: Option<String>,
    city: Option<String>,
    #[serde(rename = "countryName")]
    country_name: Option<String>,
}

/// Best-effort reverse geocoding for CSV export. Any failure falls back
/// to the raw coordinates; never an error.
pub async fn location_name(lat: Option<f64>, lng: Option<f64>) -> String {
    let (Some(lat), Some(lng)) = (lat, lng) else {
        return "Location not shared".to_string();
    };

    let url = format!(
        "https://api.bigdatacloud.net/data/reverse-geocode-client?latitude={lat}&longitude={lng}&localityLanguage=en"
    );

    match HTTP.get(&url).send().await {
        Ok(resp) => match resp.json::<ReverseGeocode>().await {
            Ok(data) => {
                let place = data.locality.or(data.city);
                match place {
                    Some(p) => format!("{}, {}", p, data.country_name.unwrap_or_default()),
                    None => format!("{lat:.4}, {lng:.4}"),
                }
            }
            Err(_) => format!("{lat:.4}, {lng:.4}"),
        },
        Err(_) => format!("{lat:.4}, {lng:.4}"),
    }
}

/// Maps link for a coordinate pair, shown in admin record views.
pub fn maps_link(lat: Option<f64>, lng: Option<f64>) -> Option<String> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(format!("https://www.google.com/maps?q={lat},{lng}")),
        _ => None,
    }
}

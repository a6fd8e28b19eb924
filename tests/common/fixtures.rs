//! Response fixtures and mock-server mounting helpers

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Listing path under [`mock_config`](super::mock_config)
pub const LISTING_PATH: &str = "/3/movie/now_playing";

/// Smallest payload the image decoder accepts as JPEG
pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

/// PNG signature followed by a truncated IHDR
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00];

/// Request path of a poster under [`mock_config`](super::mock_config)
pub fn poster_path(key: &str) -> String {
    format!("/t/p/w500{}", key)
}

/// Listing body for `(id, score, poster_path)` triples, in the given order
pub fn listing_body(records: &[(i64, f64, Option<&str>)]) -> serde_json::Value {
    let results: Vec<serde_json::Value> = records
        .iter()
        .map(|(id, score, poster)| {
            serde_json::json!({
                "adult": false,
                "id": id,
                "title": format!("Movie {}", id),
                "original_title": format!("Movie {}", id),
                "overview": format!("Overview of movie {}", id),
                "poster_path": poster,
                "backdrop_path": null,
                "vote_average": score,
                "vote_count": 100,
                "release_date": "2024-11-27",
                "genre_ids": [18, 53],
            })
        })
        .collect();

    serde_json::json!({
        "dates": { "maximum": "2024-12-31", "minimum": "2024-11-19" },
        "page": 1,
        "results": results,
        "total_pages": 1,
        "total_results": records.len(),
    })
}

/// Mount the listing endpoint, expecting exactly `times` requests
pub async fn mount_listing(server: &MockServer, body: serde_json::Value, times: u64) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

/// Mount a poster, expecting exactly `times` requests
pub async fn mount_poster(
    server: &MockServer,
    key: &str,
    bytes: &[u8],
    delay: Duration,
    times: u64,
) {
    Mock::given(method("GET"))
        .and(path(poster_path(key)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(bytes.to_vec())
                .set_delay(delay),
        )
        .expect(times)
        .mount(server)
        .await;
}

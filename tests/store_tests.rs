// tests/store_tests.rs

mod common;

use std::io::Cursor;

use common::{TestApp, spawn_app};
use reqwest::multipart::{Form, Part};

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

#[tokio::test]
async fn same_name_gets_numbered_slug() {
    let app = spawn_app().await;
    let (token, user_id, _) = app.register("Owner").await;

    let first = app.create_store(&token, TestApp::store_form("Coffee Shop", 2.35, 48.85)).await;
    let second = app.create_store(&token, TestApp::store_form("Coffee Shop", 2.36, 48.86)).await;

    assert_eq!(first["slug"], "coffee-shop");
    assert_eq!(second["slug"], "coffee-shop-2");
    assert_eq!(first["author_id"], user_id);
    assert_eq!(first["location"]["type"], "Point");
    assert_eq!(first["location"]["coordinates"][0], 2.35);
    assert_eq!(first["location"]["coordinates"][1], 48.85);
}

#[tokio::test]
async fn rename_picks_next_free_slug_and_unchanged_name_keeps_it() {
    let app = spawn_app().await;
    let (token, _, _) = app.register("Owner").await;

    app.create_store(&token, TestApp::store_form("Coffee Shop", 2.35, 48.85)).await;
    app.create_store(&token, TestApp::store_form("Coffee Shop", 2.35, 48.85)).await;
    let tea = app.create_store(&token, TestApp::store_form("Tea House", 2.35, 48.85)).await;
    let tea_id = tea["id"].as_i64().unwrap();
    assert_eq!(tea["slug"], "tea-house");

    let renamed = app
        .client
        .post(app.url(&format!("/add/{}", tea_id)))
        .bearer_auth(&token)
        .multipart(TestApp::store_form("Coffee Shop", 2.35, 48.85))
        .send()
        .await
        .unwrap();
    assert_eq!(renamed.status().as_u16(), 200);
    let body = renamed.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["store"]["slug"], "coffee-shop-3");

    // Saving again under the same name leaves the slug alone.
    let again = app
        .client
        .post(app.url(&format!("/add/{}", tea_id)))
        .bearer_auth(&token)
        .multipart(TestApp::store_form("Coffee Shop", 2.40, 48.90).text("tags", "Wifi"))
        .send()
        .await
        .unwrap();
    let body = again.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["store"]["slug"], "coffee-shop-3");
    assert_eq!(body["store"]["tags"], serde_json::json!(["Wifi"]));
}

#[tokio::test]
async fn only_the_owner_can_edit() {
    let app = spawn_app().await;
    let (owner, _, _) = app.register("Owner").await;
    let (intruder, _, _) = app.register("Intruder").await;

    let store = app.create_store(&owner, TestApp::store_form("Bakery", 2.35, 48.85)).await;
    let id = store["id"].as_i64().unwrap();

    let edit_form = app
        .client
        .get(app.url(&format!("/stores/{}/edit", id)))
        .bearer_auth(&intruder)
        .send()
        .await
        .unwrap();
    assert_eq!(edit_form.status().as_u16(), 403);

    let update = app
        .client
        .post(app.url(&format!("/add/{}", id)))
        .bearer_auth(&intruder)
        .multipart(TestApp::store_form("Stolen Bakery", 2.35, 48.85))
        .send()
        .await
        .unwrap();
    assert_eq!(update.status().as_u16(), 403);
    let body = update.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["error"], "You must own a store in order to edit it!");

    let detail = app.get_json("/store/bakery").await;
    assert_eq!(detail["store"]["name"], "Bakery");

    let owner_form = app
        .client
        .get(app.url(&format!("/stores/{}/edit", id)))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(owner_form.status().as_u16(), 200);
}

#[tokio::test]
async fn invalid_store_form_is_rejected() {
    let app = spawn_app().await;
    let (token, _, _) = app.register("Owner").await;

    let no_coordinates = Form::new()
        .text("name", "Nowhere")
        .text("location[address]", "1 Main Street");
    let response = app.post_store(&token, no_coordinates).await;
    assert_eq!(response.status().as_u16(), 400);

    let no_name = TestApp::store_form("", 2.35, 48.85);
    let response = app.post_store(&token, no_name).await;
    assert_eq!(response.status().as_u16(), 400);

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stores")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn page_past_the_end_redirects_to_last_page() {
    let app = spawn_app().await;
    let (token, _, _) = app.register("Owner").await;

    for i in 0..5 {
        app.create_store(&token, TestApp::store_form(&format!("Shop {}", i), 2.35, 48.85)).await;
    }

    let response = app.client.get(app.url("/stores/page/99")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(response.headers()["location"], "/stores/page/2");
    let notice = response.headers()["x-flash-info"].to_str().unwrap();
    assert!(notice.contains("99"));

    let last = app.get_json("/stores/page/2").await;
    assert_eq!(last["stores"].as_array().unwrap().len(), 1);
    assert_eq!(last["pages"], 2);
    assert_eq!(last["count"], 5);

    let first = app.get_json("/stores").await;
    assert_eq!(first["stores"].as_array().unwrap().len(), 4);
    assert_eq!(first["page"], 1);

    let zero = app.client.get(app.url("/stores/page/0")).send().await.unwrap();
    assert_eq!(zero.status().as_u16(), 400);
}

#[tokio::test]
async fn tag_counts_and_filter() {
    let app = spawn_app().await;
    let (token, _, _) = app.register("Owner").await;

    app.create_store(
        &token,
        TestApp::store_form("Cafe One", 2.35, 48.85).text("tags", "Wifi").text("tags", "Open Late"),
    )
    .await;
    app.create_store(&token, TestApp::store_form("Cafe Two", 2.35, 48.85).text("tags", "Wifi"))
        .await;
    app.create_store(&token, TestApp::store_form("Untagged", 2.35, 48.85)).await;

    let all = app.get_json("/tags").await;
    let tags = all["tags"].as_array().unwrap();
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0]["tag"], "Wifi");
    assert_eq!(tags[0]["count"], 2);
    assert_eq!(tags[1]["tag"], "Open Late");
    assert_eq!(tags[1]["count"], 1);
    // Without a tag, every tagged store is listed.
    assert_eq!(all["stores"].as_array().unwrap().len(), 2);

    let late = app.get_json("/tags/Open%20Late").await;
    let stores = late["stores"].as_array().unwrap();
    assert_eq!(stores.len(), 1);
    assert_eq!(stores[0]["name"], "Cafe One");
    assert_eq!(late["tag"], "Open Late");
}

#[tokio::test]
async fn photo_is_resized_to_800_wide() {
    let app = spawn_app().await;
    let (token, _, _) = app.register("Owner").await;

    let photo = Part::bytes(png_bytes(1600, 900))
        .file_name("shop.png")
        .mime_str("image/png")
        .unwrap();
    let form = TestApp::store_form("Photo Shop", 2.35, 48.85).part("photo", photo);
    let store = app.create_store(&token, form).await;

    let filename = store["photo"].as_str().unwrap();
    assert!(filename.ends_with(".png"));
    let (width, height) = image::image_dimensions(app.uploads_dir.join(filename)).unwrap();
    assert_eq!((width, height), (800, 450));

    let served = app
        .client
        .get(app.url(&format!("/uploads/{}", filename)))
        .send()
        .await
        .unwrap();
    assert_eq!(served.status().as_u16(), 200);
}

#[tokio::test]
async fn non_image_upload_is_rejected_and_nothing_is_saved() {
    let app = spawn_app().await;
    let (token, _, _) = app.register("Owner").await;

    let doc = Part::bytes(b"%PDF-1.4 not an image".to_vec())
        .file_name("menu.pdf")
        .mime_str("application/pdf")
        .unwrap();
    let form = TestApp::store_form("Pdf Shop", 2.35, 48.85).part("photo", doc);
    let response = app.post_store(&token, form).await;
    assert_eq!(response.status().as_u16(), 415);

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stores")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn detail_page_includes_author_and_reviews() {
    let app = spawn_app().await;
    let (owner, owner_id, _) = app.register("Owner").await;
    let (critic, critic_id, _) = app.register("Critic").await;

    let store = app.create_store(&owner, TestApp::store_form("Noodle Bar", 2.35, 48.85)).await;
    let id = store["id"].as_i64().unwrap();

    let response = app.review(&critic, id, 4).await;
    assert_eq!(response.status().as_u16(), 201);

    let detail = app.get_json("/store/noodle-bar").await;
    assert_eq!(detail["title"], "Welcome to Noodle Bar");
    assert_eq!(detail["store"]["author"]["id"], owner_id);
    let reviews = detail["store"]["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["rating"], 4);
    assert_eq!(reviews[0]["author"]["id"], critic_id);

    // Listings load neither.
    let feed = app.get_json("/stores").await;
    assert!(feed["stores"][0].get("reviews").is_none());
    assert!(feed["stores"][0].get("author").is_none());
}

#[tokio::test]
async fn unknown_slug_is_not_found() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/store/no-such-store")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn public_pages_show_author_names_but_never_emails() {
    let app = spawn_app().await;
    let (owner, owner_id, owner_email) = app.register("Owner").await;
    let (critic, critic_id, critic_email) = app.register("Critic").await;

    let store = app.create_store(&owner, TestApp::store_form("Ramen Bar", 2.35, 48.85)).await;
    let id = store["id"].as_i64().unwrap();
    app.review(&critic, id, 5).await;
    app.review(&critic, id, 4).await;

    let detail = app.get_json("/store/ramen-bar").await;
    assert_eq!(detail["store"]["author"]["id"], owner_id);
    assert_eq!(detail["store"]["author"]["name"], "Owner");
    assert!(detail["store"]["author"].get("email").is_none());
    let review = &detail["store"]["reviews"][0];
    assert_eq!(review["author"]["id"], critic_id);
    assert_eq!(review["author"]["name"], "Critic");
    assert!(review["author"].get("email").is_none());

    let top = app.get_json("/top").await;
    assert_eq!(top["stores"][0]["reviews"][0]["author"]["name"], "Critic");

    for body in [detail.to_string(), top.to_string()] {
        assert!(!body.contains(&owner_email));
        assert!(!body.contains(&critic_email));
        assert!(!body.contains("\"email\""));
    }
}

#[tokio::test]
async fn failed_store_write_leaves_no_photo_behind() {
    let app = spawn_app().await;
    let (token, user_id, _) = app.register("Ghost").await;

    // The session outlives the account, so the insert trips the author foreign key.
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&app.pool)
        .await
        .unwrap();

    let photo = Part::bytes(png_bytes(1200, 600))
        .file_name("shop.png")
        .mime_str("image/png")
        .unwrap();
    let form = TestApp::store_form("Ghost Shop", 2.35, 48.85).part("photo", photo);
    let response = app.post_store(&token, form).await;
    assert_eq!(response.status().as_u16(), 500);

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stores")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    let leftover = std::fs::read_dir(&app.uploads_dir)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftover, 0);
}

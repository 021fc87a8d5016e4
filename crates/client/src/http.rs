//! reqwest-backed implementation of [`CanteenApi`].
//!
//! Every HTTP status is mapped into [`AppError`] here and nowhere else.
//! A 401 from any endpoint tears the shared [`AuthSession`] down, so the
//! view layer finds the role-appropriate sign-in redirect waiting for it.

use async_trait::async_trait;
use canteen_common::{ApiConfig, AppError, AppResult, AuthSession};
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response, StatusCode, multipart};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::api::CanteenApi;
use crate::types::{
    Category, CooldownBody, Dish, FeedbackEntry, ImageUpload, NewDish, NewDishFeedback,
    NewSystemFeedback, Paginated, PollHistory, Vote, VotePoll, VoteReceipt, Wish, WishTally,
};

/// HTTP client for the canteen backend.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    session: AuthSession,
}

impl HttpApi {
    /// Build a client from configuration.
    pub fn new(config: &ApiConfig, session: AuthSession) -> AppResult<Self> {
        Url::parse(&config.base_url)
            .map_err(|e| AppError::Config(format!("invalid api.base_url: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// The auth session this client attaches tokens from.
    #[must_use]
    pub const fn session(&self) -> &AuthSession {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    /// Attach the bearer token, failing before any request when signed out.
    fn authed(&self, builder: RequestBuilder) -> AppResult<RequestBuilder> {
        let token = self.session.require_bearer()?;
        Ok(builder.bearer_auth(token))
    }

    async fn send(&self, builder: RequestBuilder) -> AppResult<Response> {
        builder
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> AppResult<T> {
        let status = response.status();
        if status.is_success() {
            response.json::<T>().await.map_err(|e| AppError::Api {
                status: status.as_u16(),
                message: format!("invalid response body: {e}"),
            })
        } else {
            Err(self.error_for(status, response).await)
        }
    }

    /// Success with no interesting body (deletes).
    async fn expect_ok(&self, response: Response) -> AppResult<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.error_for(status, response).await)
        }
    }

    async fn error_for(&self, status: StatusCode, response: Response) -> AppError {
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), body = %body, "request rejected");

        match status.as_u16() {
            401 => {
                self.session.invalidate();
                AppError::Unauthenticated
            }
            403 => match serde_json::from_str::<CooldownBody>(&body) {
                Ok(cooldown) => AppError::CooldownActive {
                    remaining_seconds: cooldown.remaining_seconds,
                },
                Err(_) => AppError::Forbidden(server_message(&body)),
            },
            404 => AppError::NotFound(server_message(&body)),
            409 => AppError::Conflict(server_message(&body)),
            s => AppError::Api {
                status: s,
                message: server_message(&body),
            },
        }
    }
}

/// Pull a human-readable message out of a rejection body, whatever its shape.
fn server_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct Flat {
        message: String,
    }
    #[derive(serde::Deserialize)]
    struct Nested {
        error: Flat,
    }

    if let Ok(flat) = serde_json::from_str::<Flat>(body) {
        flat.message
    } else if let Ok(nested) = serde_json::from_str::<Nested>(body) {
        nested.error.message
    } else if body.is_empty() {
        "request rejected".to_string()
    } else {
        body.chars().take(200).collect()
    }
}

/// Treat a 404 as a legal empty state.
fn none_on_absent<T>(result: AppResult<T>) -> AppResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_empty_state() => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl CanteenApi for HttpApi {
    async fn results_today(&self) -> AppResult<Option<VotePoll>> {
        debug!("GET /results/today");
        let response = self.send(self.get("results/today")).await?;
        none_on_absent(self.decode(response).await)
    }

    async fn results_upcoming(&self) -> AppResult<Vec<VotePoll>> {
        debug!("GET /results/upcoming");
        let response = self.send(self.get("results/upcoming")).await?;
        self.decode(response).await
    }

    async fn my_vote_today(&self) -> AppResult<Option<Vote>> {
        debug!("GET /votes/today");
        let request = self.authed(self.get("votes/today"))?;
        let response = self.send(request).await?;
        none_on_absent(self.decode(response).await)
    }

    async fn cast_vote(&self, dish_id: i64) -> AppResult<VoteReceipt> {
        debug!(dish_id, "POST /votes");
        let request = self
            .authed(self.client.post(self.url("votes")))?
            .json(&json!({ "dishId": dish_id }));
        let response = self.send(request).await?;
        self.decode(response).await
    }

    async fn change_vote(&self, dish_id: i64) -> AppResult<VoteReceipt> {
        debug!(dish_id, "PUT /votes");
        let request = self
            .authed(self.client.put(self.url("votes")))?
            .json(&json!({ "dishId": dish_id }));
        let response = self.send(request).await?;
        self.decode(response).await
    }

    async fn vote_history(&self, date: NaiveDate) -> AppResult<Option<PollHistory>> {
        debug!(%date, "GET /votes/history");
        let request = self
            .authed(self.get("votes/history"))?
            .query(&[("date", date.to_string())]);
        let response = self.send(request).await?;
        none_on_absent(self.decode(response).await)
    }

    async fn my_wish(&self) -> AppResult<Option<Wish>> {
        debug!("GET /wishies/me");
        let request = self.authed(self.get("wishies/me"))?;
        let response = self.send(request).await?;
        none_on_absent(self.decode(response).await)
    }

    async fn change_wish(&self, dish_id: i64) -> AppResult<Wish> {
        debug!(dish_id, "PUT /wishies");
        let request = self
            .authed(self.client.put(self.url("wishies")))?
            .json(&json!({ "dishId": dish_id }));
        let response = self.send(request).await?;
        self.decode(response).await
    }

    async fn wish_tallies(&self) -> AppResult<Vec<WishTally>> {
        debug!("GET /wishies/all");
        let response = self.send(self.get("wishies/all")).await?;
        self.decode(response).await
    }

    async fn poll_today(&self) -> AppResult<Option<VotePoll>> {
        debug!("GET /polls/today");
        let request = self.authed(self.get("polls/today"))?;
        let response = self.send(request).await?;
        none_on_absent(self.decode(response).await)
    }

    async fn pending_poll(&self, meal_date: NaiveDate) -> AppResult<Option<VotePoll>> {
        debug!(%meal_date, "GET /polls/pending");
        let request = self
            .authed(self.get("polls/pending"))?
            .query(&[("date", meal_date.to_string())]);
        let response = self.send(request).await?;
        none_on_absent(self.decode(response).await)
    }

    async fn create_poll(&self, meal_date: NaiveDate, dish_ids: &[i64]) -> AppResult<VotePoll> {
        debug!(%meal_date, dishes = dish_ids.len(), "POST /polls");
        let request = self
            .authed(self.client.post(self.url("polls")))?
            .json(&json!({ "mealDate": meal_date, "dishIds": dish_ids }));
        let response = self.send(request).await?;
        self.decode(response).await
    }

    async fn edit_poll(&self, poll_id: i64, dish_ids: &[i64]) -> AppResult<VotePoll> {
        debug!(poll_id, dishes = dish_ids.len(), "PATCH /polls/:id");
        let request = self
            .authed(self.client.patch(self.url(&format!("polls/{poll_id}"))))?
            .json(&json!({ "dishIds": dish_ids }));
        let response = self.send(request).await?;
        self.decode(response).await
    }

    async fn delete_poll(&self, poll_id: i64) -> AppResult<()> {
        debug!(poll_id, "DELETE /polls/:id");
        let request = self.authed(self.client.delete(self.url(&format!("polls/{poll_id}"))))?;
        let response = self.send(request).await?;
        self.expect_ok(response).await
    }

    async fn categories(&self) -> AppResult<Vec<Category>> {
        debug!("GET /categories");
        let response = self.send(self.get("categories")).await?;
        self.decode(response).await
    }

    async fn dishes(&self, page: u32) -> AppResult<Paginated<Dish>> {
        debug!(page, "GET /dishes");
        let request = self.get("dishes").query(&[("page", page)]);
        let response = self.send(request).await?;
        self.decode(response).await
    }

    async fn dishes_by_category(&self, category_id: i64, page: u32) -> AppResult<Paginated<Dish>> {
        debug!(category_id, page, "GET /dishes/category/:id");
        let request = self
            .get(&format!("dishes/category/{category_id}"))
            .query(&[("page", page)]);
        let response = self.send(request).await?;
        self.decode(response).await
    }

    async fn dishes_most_rated(&self) -> AppResult<Vec<Dish>> {
        debug!("GET /dishes/most-rated");
        let response = self.send(self.get("dishes/most-rated")).await?;
        self.decode(response).await
    }

    async fn dishes_most_favorited(&self) -> AppResult<Vec<Dish>> {
        debug!("GET /dishes/most-favorited");
        let response = self.send(self.get("dishes/most-favorited")).await?;
        self.decode(response).await
    }

    async fn create_dish(&self, dish: NewDish, image: Option<ImageUpload>) -> AppResult<Dish> {
        debug!(name = %dish.name_en, "POST /dishes");
        let form = dish_form(&dish, image)?;
        let request = self
            .authed(self.client.post(self.url("dishes")))?
            .multipart(form);
        let response = self.send(request).await?;
        self.decode(response).await
    }

    async fn update_dish(
        &self,
        dish_id: i64,
        dish: NewDish,
        image: Option<ImageUpload>,
    ) -> AppResult<Dish> {
        debug!(dish_id, "PUT /dishes/:id");
        let form = dish_form(&dish, image)?;
        let request = self
            .authed(self.client.put(self.url(&format!("dishes/{dish_id}"))))?
            .multipart(form);
        let response = self.send(request).await?;
        self.decode(response).await
    }

    async fn delete_dish(&self, dish_id: i64) -> AppResult<()> {
        debug!(dish_id, "DELETE /dishes/:id");
        let request = self.authed(self.client.delete(self.url(&format!("dishes/{dish_id}"))))?;
        let response = self.send(request).await?;
        self.expect_ok(response).await
    }

    async fn system_feedback(&self) -> AppResult<Vec<FeedbackEntry>> {
        debug!("GET /system-feedback");
        let response = self.send(self.get("system-feedback")).await?;
        self.decode(response).await
    }

    async fn submit_system_feedback(
        &self,
        feedback: NewSystemFeedback,
    ) -> AppResult<FeedbackEntry> {
        debug!("POST /system-feedback");
        let request = self.client.post(self.url("system-feedback")).json(&feedback);
        let response = self.send(request).await?;
        self.decode(response).await
    }

    async fn dish_feedback(&self, dish_id: i64) -> AppResult<Vec<FeedbackEntry>> {
        debug!(dish_id, "GET /feedback/dish/:id/all");
        let response = self
            .send(self.get(&format!("feedback/dish/{dish_id}/all")))
            .await?;
        self.decode(response).await
    }

    async fn submit_dish_feedback(
        &self,
        dish_id: i64,
        feedback: NewDishFeedback,
    ) -> AppResult<FeedbackEntry> {
        debug!(dish_id, "POST /feedback/dish/:id");
        let request = self
            .client
            .post(self.url(&format!("feedback/dish/{dish_id}")))
            .json(&feedback);
        let response = self.send(request).await?;
        self.decode(response).await
    }
}

fn dish_form(dish: &NewDish, image: Option<ImageUpload>) -> AppResult<multipart::Form> {
    let mut form = multipart::Form::new()
        .text("name_en", dish.name_en.clone())
        .text("category_id", dish.category_id.to_string());

    let optional = [
        ("name_kh", &dish.name_kh),
        ("description_en", &dish.description_en),
        ("description_kh", &dish.description_kh),
        ("ingredients_en", &dish.ingredients_en),
        ("ingredients_kh", &dish.ingredients_kh),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            form = form.text(key, value.clone());
        }
    }

    if let Some(image) = image {
        let part = multipart::Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.content_type)
            .map_err(|e| AppError::Validation(format!("invalid image content type: {e}")))?;
        form = form.part("image", part);
    }

    Ok(form)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use canteen_common::Role;

    fn test_api() -> HttpApi {
        let config = ApiConfig {
            base_url: "https://canteen.example.com/api/".to_string(),
            timeout_secs: 5,
            connect_timeout_secs: 2,
        };
        HttpApi::new(&config, AuthSession::new()).unwrap()
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let api = test_api();
        assert_eq!(
            api.url("/results/today"),
            "https://canteen.example.com/api/results/today"
        );
        assert_eq!(api.url("votes"), "https://canteen.example.com/api/votes");
    }

    #[test]
    fn test_authed_requires_token() {
        let api = test_api();
        assert!(matches!(
            api.authed(api.get("votes/today")),
            Err(AppError::Unauthenticated)
        ));

        api.session().sign_in("tok".to_string(), Role::Voter);
        assert!(api.authed(api.get("votes/today")).is_ok());
    }

    #[test]
    fn test_server_message_shapes() {
        assert_eq!(server_message(r#"{"message":"nope"}"#), "nope");
        assert_eq!(
            server_message(r#"{"error":{"message":"duplicate dish name"}}"#),
            "duplicate dish name"
        );
        assert_eq!(server_message(""), "request rejected");
        assert_eq!(server_message("teapot"), "teapot");
    }

    #[test]
    fn test_none_on_absent() {
        let absent: AppResult<Vote> = Err(AppError::NotFound("no vote".to_string()));
        assert!(none_on_absent(absent).unwrap().is_none());

        let failed: AppResult<Vote> = Err(AppError::Transport("offline".to_string()));
        assert!(none_on_absent(failed).is_err());
    }
}

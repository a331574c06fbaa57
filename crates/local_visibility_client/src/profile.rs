//! Location metadata from the business-information host and the profile-side
//! scoring inputs derived from it.

use crate::executor::{ApiRequest, FailureClass, RequestExecutor};
use crate::utils::location_resource;
use crate::{Credentials, InsightsError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const PROFILE_READ_MASK: &str =
    "title,categories,storefrontAddress,phoneNumbers,websiteUri,regularHours,profile";

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationProfile {
    pub title: Option<String>,
    pub categories: Option<Categories>,
    pub storefront_address: Option<serde_json::Value>,
    pub phone_numbers: Option<PhoneNumbers>,
    pub website_uri: Option<String>,
    pub regular_hours: Option<serde_json::Value>,
    pub profile: Option<ProfileDescription>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Categories {
    pub primary_category: Option<Category>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub display_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumbers {
    pub primary_phone: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ProfileDescription {
    pub description: Option<String>,
}

fn filled(s: Option<&str>) -> bool {
    s.is_some_and(|s| !s.trim().is_empty())
}

fn filled_json(v: Option<&serde_json::Value>) -> bool {
    match v {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Object(o)) => !o.is_empty(),
        Some(serde_json::Value::Array(a)) => !a.is_empty(),
        Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

impl LocationProfile {
    /// Percentage (0-100) of the seven tracked profile fields that are filled.
    pub fn completeness(&self) -> u8 {
        let checks = [
            filled(self.title.as_deref()),
            filled(
                self.categories
                    .as_ref()
                    .and_then(|c| c.primary_category.as_ref())
                    .and_then(|c| c.display_name.as_deref()),
            ),
            filled_json(self.storefront_address.as_ref()),
            filled(
                self.phone_numbers
                    .as_ref()
                    .and_then(|p| p.primary_phone.as_deref()),
            ),
            filled(self.website_uri.as_deref()),
            filled_json(self.regular_hours.as_ref()),
            filled(self.profile.as_ref().and_then(|p| p.description.as_deref())),
        ];
        let done = checks.iter().filter(|c| **c).count() as f64;
        (done / checks.len() as f64 * 100.0).round() as u8
    }
}

/// Profile-side scoring inputs. Photo, post and Q&A counts come from the
/// caller; completeness usually comes from [`LocationProfile::completeness`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSignals {
    pub profile_photos: u32,
    pub recent_posts: u32,
    pub profile_completeness: f64,
    pub qa_activity: u32,
}

/// Fetch location metadata. 403/404 yield an empty profile.
pub async fn fetch_location_profile(
    executor: &RequestExecutor,
    base_url: &str,
    credentials: &Credentials,
    location_id: &str,
) -> Result<LocationProfile, InsightsError> {
    let url = format!("{}/v1/{}", base_url, location_resource(location_id));
    let request = ApiRequest::get(url).query("readMask", PROFILE_READ_MASK);
    let resp = executor.execute(credentials, &request).await?;
    match resp.failure_class() {
        None => resp.json("location profile"),
        Some(FailureClass::PermissionDenied | FailureClass::Unavailable) => {
            warn!(location_id, status = resp.status, "location profile unavailable");
            Ok(LocationProfile::default())
        }
        Some(_) => {
            warn!(location_id, status = resp.status, body = %resp.body_snippet(), "location profile request rejected");
            Ok(LocationProfile::default())
        }
    }
}

//! Device checkin.
//!
//! Registers the emulated device and obtains the `androidId` every later
//! call identifies itself with.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use prost::Message;
use reqwest::Method;

use super::session::CheckinId;
use crate::codec::proto::{
    AndroidBuildProto, AndroidCheckinProto, AndroidCheckinRequest, AndroidCheckinResponse,
    DeviceConfigurationProto,
};
use crate::codec::request::CONTENT_TYPE_CHECKIN;
use crate::codec::{wire, EncodedRequest, Endpoint};
use crate::device::DeviceProfile;
use crate::error::AuthError;
use crate::retrieve::{RetryMode, Transport};

/// Version of the checkin protocol spoken here.
const CHECKIN_VERSION: i32 = 3;
/// Play Services version advertised in the build block.
const GOOGLE_SERVICES_VERSION: i32 = 16_089_037;

/// Build the checkin message describing `device`.
pub fn checkin_request(device: &DeviceProfile) -> AndroidCheckinRequest {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();

    AndroidCheckinRequest {
        id: Some(0),
        checkin: Some(AndroidCheckinProto {
            build: Some(AndroidBuildProto {
                id: Some(device.build_fingerprint.clone()),
                product: Some(device.hardware.clone()),
                carrier: Some("Google".into()),
                radio: Some(device.radio.clone()),
                bootloader: Some(device.bootloader.clone()),
                client: Some(device.client.clone()),
                timestamp: Some(now),
                google_services: Some(GOOGLE_SERVICES_VERSION),
                device: Some(device.device.clone()),
                sdk_version: Some(device.sdk_version as i32),
                model: Some(device.model.clone()),
                manufacturer: Some(device.manufacturer.clone()),
                build_product: Some(device.product.clone()),
                ota_installed: Some(false),
            }),
            last_checkin_msec: Some(0),
            cell_operator: Some(device.cell_operator.clone()),
            sim_operator: Some(device.sim_operator.clone()),
            roaming: Some(device.roaming.clone()),
            user_number: Some(0),
        }),
        locale: Some(device.locale.clone()),
        time_zone: Some(device.time_zone.clone()),
        version: Some(CHECKIN_VERSION),
        device_configuration: Some(device_configuration(device)),
        fragment: Some(0),
        user_serial_number: Some(0),
        ..Default::default()
    }
}

fn device_configuration(device: &DeviceProfile) -> DeviceConfigurationProto {
    DeviceConfigurationProto {
        touch_screen: Some(device.touch_screen),
        keyboard: Some(device.keyboard),
        navigation: Some(device.navigation),
        screen_layout: Some(device.screen_layout),
        has_hard_keyboard: Some(device.has_hard_keyboard),
        has_five_way_navigation: Some(device.has_five_way_navigation),
        screen_density: Some(device.screen_density as i32),
        gl_es_version: Some(device.gl_es_version),
        system_shared_library: device.shared_libraries.clone(),
        system_available_feature: device.features.clone(),
        native_platform: device.abis.clone(),
        screen_width: Some(device.screen_width as i32),
        screen_height: Some(device.screen_height as i32),
        system_supported_locale: device.locales.clone(),
        gl_extension: device.gl_extensions.clone(),
    }
}

/// Encoded checkin call.
pub fn encode(device: &DeviceProfile) -> EncodedRequest {
    EncodedRequest {
        endpoint: Endpoint::Checkin,
        method: Method::POST,
        target: String::new(),
        content_type: Some(CONTENT_TYPE_CHECKIN),
        body: Some(Bytes::from(checkin_request(device).encode_to_vec())),
    }
}

/// Read the checkin identity out of a reply body.
pub fn parse_response(body: &[u8]) -> Result<CheckinId, AuthError> {
    let response: AndroidCheckinResponse = wire::decode_message(body)
        .map_err(|e| AuthError::ProtocolMismatch(format!("checkin reply: {}", e)))?;
    match response.android_id {
        Some(id) if id != 0 => Ok(CheckinId {
            android_id: id,
            security_token: response.security_token.unwrap_or_default(),
        }),
        _ => Err(AuthError::ProtocolMismatch(
            "checkin reply carries no androidId".to_string(),
        )),
    }
}

/// Run the checkin exchange.
pub async fn perform(transport: &Transport) -> Result<CheckinId, AuthError> {
    let request = encode(transport.device());
    let body = transport
        .execute(&request, None, RetryMode::Idempotent)
        .await?;
    let checkin = parse_response(&body)?;
    tracing::info!(android_id = %checkin.android_id_hex(), "device checkin complete");
    Ok(checkin)
}

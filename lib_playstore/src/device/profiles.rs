//! Built-in handset profiles.
//!
//! Values were captured from real handsets running the stock ROM. The store
//! only serves builds compatible with the advertised ABIs, features and
//! screen, so changing a field here changes what the backend returns.

use super::DeviceProfile;

/// Profile used when the configuration does not name one.
pub const DEFAULT_DEVICE: &str = "bacon";

/// Names of every built-in profile.
pub const NAMES: &[&str] = &["bacon", "hammerhead", "angler"];

/// Look up a built-in profile by name (case-insensitive).
pub fn find(name: &str) -> Option<DeviceProfile> {
    match name.to_ascii_lowercase().as_str() {
        "bacon" => Some(bacon()),
        "hammerhead" => Some(hammerhead()),
        "angler" => Some(angler()),
        _ => None,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const SHARED_LIBRARIES: &[&str] = &[
    "android.test.runner",
    "com.android.future.usb.accessory",
    "com.android.location.provider",
    "com.android.media.remotedisplay",
    "com.android.mediadrm.signer",
    "com.google.android.maps",
    "com.google.android.media.effects",
    "com.google.widevine.software.drm",
    "javax.obex",
    "org.apache.http.legacy",
];

const COMMON_FEATURES: &[&str] = &[
    "android.hardware.audio.output",
    "android.hardware.bluetooth",
    "android.hardware.bluetooth_le",
    "android.hardware.camera",
    "android.hardware.camera.any",
    "android.hardware.camera.autofocus",
    "android.hardware.camera.flash",
    "android.hardware.camera.front",
    "android.hardware.faketouch",
    "android.hardware.location",
    "android.hardware.location.gps",
    "android.hardware.location.network",
    "android.hardware.microphone",
    "android.hardware.nfc",
    "android.hardware.screen.landscape",
    "android.hardware.screen.portrait",
    "android.hardware.sensor.accelerometer",
    "android.hardware.sensor.compass",
    "android.hardware.sensor.gyroscope",
    "android.hardware.sensor.light",
    "android.hardware.sensor.proximity",
    "android.hardware.telephony",
    "android.hardware.telephony.gsm",
    "android.hardware.touchscreen",
    "android.hardware.touchscreen.multitouch",
    "android.hardware.touchscreen.multitouch.distinct",
    "android.hardware.touchscreen.multitouch.jazzhand",
    "android.hardware.usb.accessory",
    "android.hardware.usb.host",
    "android.hardware.wifi",
    "android.hardware.wifi.direct",
    "android.software.app_widgets",
    "android.software.backup",
    "android.software.connectionservice",
    "android.software.device_admin",
    "android.software.home_screen",
    "android.software.input_methods",
    "android.software.live_wallpaper",
    "android.software.managed_users",
    "android.software.print",
    "android.software.sip",
    "android.software.sip.voip",
    "android.software.voice_recognizers",
    "android.software.webview",
];

const GL_EXTENSIONS: &[&str] = &[
    "GL_AMD_compressed_ATC_texture",
    "GL_AMD_performance_monitor",
    "GL_EXT_debug_label",
    "GL_EXT_debug_marker",
    "GL_EXT_discard_framebuffer",
    "GL_EXT_robustness",
    "GL_EXT_texture_format_BGRA8888",
    "GL_EXT_texture_type_2_10_10_10_REV",
    "GL_KHR_debug",
    "GL_OES_EGL_image",
    "GL_OES_EGL_image_external",
    "GL_OES_compressed_ETC1_RGB8_texture",
    "GL_OES_depth24",
    "GL_OES_depth_texture",
    "GL_OES_element_index_uint",
    "GL_OES_packed_depth_stencil",
    "GL_OES_rgb8_rgba8",
    "GL_OES_standard_derivatives",
    "GL_OES_texture_3D",
    "GL_OES_texture_float",
    "GL_OES_texture_half_float",
    "GL_OES_texture_npot",
    "GL_OES_vertex_array_object",
    "GL_OES_vertex_half_float",
    "GL_QCOM_alpha_test",
    "GL_QCOM_binning_control",
    "GL_QCOM_driver_control",
    "GL_QCOM_extended_get",
    "GL_QCOM_tiled_rendering",
];

const LOCALES: &[&str] = &[
    "de", "de_DE", "en", "en_GB", "en_US", "es", "es_ES", "fr", "fr_FR", "it", "it_IT", "ja",
    "ja_JP", "pt", "pt_BR", "ru", "ru_RU", "zh_CN", "zh_TW",
];

/// OnePlus One, Android 6.0.1 (CyanogenOS 13).
pub fn bacon() -> DeviceProfile {
    DeviceProfile {
        name: "bacon".into(),
        build_fingerprint: "oneplus/bacon/A0001:6.0.1/MHC19Q/ZNH2KAS1KN:user/release-keys"
            .into(),
        build_id: "MHC19Q".into(),
        device: "A0001".into(),
        hardware: "bacon".into(),
        product: "bacon".into(),
        model: "A0001".into(),
        manufacturer: "OnePlus".into(),
        bootloader: "unknown".into(),
        radio: "MPSS.TA.2.3.c1-00395-8974_GEN_PACK-1_V042".into(),
        client: "android-google".into(),
        release: "6.0.1".into(),
        sdk_version: 23,
        locale: "en_US".into(),
        time_zone: "America/New_York".into(),
        country: "us".into(),
        sim_operator: "310260".into(),
        cell_operator: "310260".into(),
        roaming: "mobile-notroaming".into(),
        screen_width: 1080,
        screen_height: 1920,
        screen_density: 480,
        touch_screen: 3,
        keyboard: 1,
        navigation: 1,
        screen_layout: 2,
        has_hard_keyboard: false,
        has_five_way_navigation: false,
        gl_es_version: 196_608,
        abis: strings(&["armeabi-v7a", "armeabi"]),
        shared_libraries: strings(SHARED_LIBRARIES),
        features: strings(COMMON_FEATURES),
        gl_extensions: strings(GL_EXTENSIONS),
        locales: strings(LOCALES),
        vending_version: 80_798_000,
        vending_version_string: "7.9.80".into(),
        gsf_id: None,
    }
}

/// LG Nexus 5, Android 6.0.1.
pub fn hammerhead() -> DeviceProfile {
    DeviceProfile {
        name: "hammerhead".into(),
        build_fingerprint: "google/hammerhead/hammerhead:6.0.1/M4B30Z/3437181:user/release-keys"
            .into(),
        build_id: "M4B30Z".into(),
        device: "hammerhead".into(),
        hardware: "hammerhead".into(),
        product: "hammerhead".into(),
        model: "Nexus 5".into(),
        manufacturer: "LGE".into(),
        bootloader: "HHZ20h".into(),
        radio: "M8974A-2.0.50.2.30".into(),
        client: "android-google".into(),
        release: "6.0.1".into(),
        sdk_version: 23,
        locale: "en_US".into(),
        time_zone: "America/New_York".into(),
        country: "us".into(),
        sim_operator: "310260".into(),
        cell_operator: "310260".into(),
        roaming: "mobile-notroaming".into(),
        screen_width: 1080,
        screen_height: 1776,
        screen_density: 480,
        touch_screen: 3,
        keyboard: 1,
        navigation: 1,
        screen_layout: 2,
        has_hard_keyboard: false,
        has_five_way_navigation: false,
        gl_es_version: 196_608,
        abis: strings(&["armeabi-v7a", "armeabi"]),
        shared_libraries: strings(SHARED_LIBRARIES),
        features: strings(COMMON_FEATURES),
        gl_extensions: strings(GL_EXTENSIONS),
        locales: strings(LOCALES),
        vending_version: 80_798_000,
        vending_version_string: "7.9.80".into(),
        gsf_id: None,
    }
}

/// Huawei Nexus 6P, Android 7.1.2.
pub fn angler() -> DeviceProfile {
    let mut features = strings(COMMON_FEATURES);
    features.push("android.hardware.fingerprint".into());
    features.push("android.hardware.vulkan.level".into());
    DeviceProfile {
        name: "angler".into(),
        build_fingerprint: "google/angler/angler:7.1.2/N2G48C/4104010:user/release-keys".into(),
        build_id: "N2G48C".into(),
        device: "angler".into(),
        hardware: "angler".into(),
        product: "angler".into(),
        model: "Nexus 6P".into(),
        manufacturer: "Huawei".into(),
        bootloader: "angler-03.72".into(),
        radio: "angler-03.81".into(),
        client: "android-google".into(),
        release: "7.1.2".into(),
        sdk_version: 25,
        locale: "en_US".into(),
        time_zone: "America/New_York".into(),
        country: "us".into(),
        sim_operator: "310260".into(),
        cell_operator: "310260".into(),
        roaming: "mobile-notroaming".into(),
        screen_width: 1440,
        screen_height: 2392,
        screen_density: 560,
        touch_screen: 3,
        keyboard: 1,
        navigation: 1,
        screen_layout: 2,
        has_hard_keyboard: false,
        has_five_way_navigation: false,
        gl_es_version: 196_610,
        abis: strings(&["arm64-v8a", "armeabi-v7a", "armeabi"]),
        shared_libraries: strings(SHARED_LIBRARIES),
        features,
        gl_extensions: strings(GL_EXTENSIONS),
        locales: strings(LOCALES),
        vending_version: 80_798_000,
        vending_version_string: "7.9.80".into(),
        gsf_id: None,
    }
}

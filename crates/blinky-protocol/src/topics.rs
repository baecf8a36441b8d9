//! MQTT topic builders and parsers for IoT Hub and the provisioning service.
//!
//! Topic structure:
//! ```text
//! devices/{device_id}/messages/events/{property_bag}
//! devices/{device_id}/messages/devicebound/{property_bag}
//! $iothub/methods/POST/{method}/?$rid={rid}
//! $iothub/methods/res/{status}/?$rid={rid}
//! $dps/registrations/PUT/iotdps-register/?$rid={rid}
//! $dps/registrations/GET/iotdps-get-operationstatus/?$rid={rid}&operationId={op}
//! $dps/registrations/res/{status}/?$rid={rid}&retry-after={secs}
//! ```

/// API version sent in the hub MQTT username.
pub const HUB_API_VERSION: &str = "2021-04-12";

/// API version sent in the provisioning MQTT username.
pub const DPS_API_VERSION: &str = "2019-03-31";

// ─── MQTT identity ───

/// MQTT username for a device connecting to a hub.
pub fn hub_username(host_name: &str, device_id: &str) -> String {
    format!("{host_name}/{device_id}/?api-version={HUB_API_VERSION}")
}

/// MQTT username for a device registering with the provisioning service.
pub fn dps_username(id_scope: &str, registration_id: &str) -> String {
    format!("{id_scope}/registrations/{registration_id}/api-version={DPS_API_VERSION}")
}

// ─── Device-to-cloud ───

/// Telemetry topic with an encoded property bag appended.
pub fn device_events(device_id: &str, properties: &[(&str, &str)]) -> String {
    format!(
        "devices/{device_id}/messages/events/{}",
        encode_property_bag(properties)
    )
}

// ─── Cloud-to-device ───

/// Subscription filter for cloud-to-device messages.
pub fn devicebound_filter(device_id: &str) -> String {
    format!("devices/{device_id}/messages/devicebound/#")
}

/// Parse the property bag of a cloud-to-device topic.
/// Returns `None` if the topic is not a devicebound topic.
pub fn parse_devicebound(topic: &str) -> Option<Vec<(String, String)>> {
    let rest = topic.strip_prefix("devices/")?;
    let (_device_id, rest) = rest.split_once('/')?;
    let bag = rest.strip_prefix("messages/devicebound")?;
    let bag = bag.strip_prefix('/').unwrap_or(bag);
    Some(parse_query(bag))
}

// ─── Direct methods ───

/// Subscription filter for direct-method invocations.
pub const METHODS_FILTER: &str = "$iothub/methods/POST/#";

/// Topic on which a direct-method reply is published.
pub fn method_response(status: u16, request_id: &str) -> String {
    format!("$iothub/methods/res/{status}/?$rid={request_id}")
}

/// Parse `$iothub/methods/POST/{name}/?$rid={rid}` into `(name, rid)`.
pub fn parse_method_request(topic: &str) -> Option<(String, String)> {
    let rest = topic.strip_prefix("$iothub/methods/POST/")?;
    let (name, query) = rest.split_once("/?")?;
    if name.is_empty() {
        return None;
    }
    let rid = parse_query(query)
        .into_iter()
        .find(|(k, _)| k == "$rid")
        .map(|(_, v)| v)?;
    Some((name.to_string(), rid))
}

// ─── Provisioning ───

/// Subscription filter for provisioning responses.
pub const DPS_RESPONSE_FILTER: &str = "$dps/registrations/res/#";

pub fn dps_register(request_id: &str) -> String {
    format!("$dps/registrations/PUT/iotdps-register/?$rid={request_id}")
}

pub fn dps_operation_status(request_id: &str, operation_id: &str) -> String {
    format!(
        "$dps/registrations/GET/iotdps-get-operationstatus/?$rid={request_id}&operationId={}",
        percent_encode(operation_id)
    )
}

/// Parsed `$dps/registrations/res/{status}/?...` topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpsResponseTopic {
    pub status: u16,
    pub request_id: Option<String>,
    pub retry_after_secs: Option<u64>,
}

pub fn parse_dps_response(topic: &str) -> Option<DpsResponseTopic> {
    let rest = topic.strip_prefix("$dps/registrations/res/")?;
    let (status, query) = rest.split_once("/?").unwrap_or((rest.trim_end_matches('/'), ""));
    let status = status.parse().ok()?;

    let mut parsed = DpsResponseTopic {
        status,
        request_id: None,
        retry_after_secs: None,
    };
    for (k, v) in parse_query(query) {
        match k.as_str() {
            "$rid" => parsed.request_id = Some(v),
            "retry-after" => parsed.retry_after_secs = v.parse().ok(),
            _ => {}
        }
    }
    Some(parsed)
}

// ─── Property bags ───

/// Encode `k=v&k2=v2` with both sides percent-encoded.
pub fn encode_property_bag(properties: &[(&str, &str)]) -> String {
    properties
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Split a query string / property bag into decoded pairs. Keys without a
/// value map to an empty string.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (percent_decode(k), percent_decode(v))
        })
        .collect()
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Decode `%XX` escapes. Malformed escapes are kept literally.
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_username_format() {
        assert_eq!(
            hub_username("hub.azure-devices.net", "pi-01"),
            "hub.azure-devices.net/pi-01/?api-version=2021-04-12"
        );
    }

    #[test]
    fn dps_username_format() {
        assert_eq!(
            dps_username("0ne000ABCDE", "pi-01"),
            "0ne000ABCDE/registrations/pi-01/api-version=2019-03-31"
        );
    }

    #[test]
    fn events_topic_carries_properties() {
        assert_eq!(
            device_events("pi-01", &[("temperatureAlert", "false"), ("stateLed", "true")]),
            "devices/pi-01/messages/events/temperatureAlert=false&stateLed=true"
        );
    }

    #[test]
    fn devicebound_filter_topic() {
        assert_eq!(
            devicebound_filter("pi-01"),
            "devices/pi-01/messages/devicebound/#"
        );
    }

    #[test]
    fn parse_devicebound_properties() {
        let props = parse_devicebound(
            "devices/pi-01/messages/devicebound/%24.to=%2Fdevices%2Fpi-01&color=red",
        )
        .unwrap();
        assert_eq!(props[0], ("$.to".into(), "/devices/pi-01".into()));
        assert_eq!(props[1], ("color".into(), "red".into()));
    }

    #[test]
    fn parse_devicebound_without_properties() {
        let props = parse_devicebound("devices/pi-01/messages/devicebound/").unwrap();
        assert!(props.is_empty());
        assert!(parse_devicebound("devices/pi-01/messages/events/").is_none());
    }

    #[test]
    fn method_request_roundtrip() {
        let parsed = parse_method_request("$iothub/methods/POST/start/?$rid=1f").unwrap();
        assert_eq!(parsed, ("start".to_string(), "1f".to_string()));
        assert_eq!(method_response(200, "1f"), "$iothub/methods/res/200/?$rid=1f");
    }

    #[test]
    fn method_request_requires_rid() {
        assert!(parse_method_request("$iothub/methods/POST/start/?foo=1").is_none());
        assert!(parse_method_request("$iothub/methods/POST//?$rid=1").is_none());
        assert!(parse_method_request("devices/pi/messages/devicebound/").is_none());
    }

    #[test]
    fn dps_topics() {
        assert_eq!(
            dps_register("1"),
            "$dps/registrations/PUT/iotdps-register/?$rid=1"
        );
        assert_eq!(
            dps_operation_status("2", "4.abc.def"),
            "$dps/registrations/GET/iotdps-get-operationstatus/?$rid=2&operationId=4.abc.def"
        );
    }

    #[test]
    fn parse_dps_response_with_retry_after() {
        let parsed =
            parse_dps_response("$dps/registrations/res/202/?$rid=1&retry-after=3").unwrap();
        assert_eq!(parsed.status, 202);
        assert_eq!(parsed.request_id.as_deref(), Some("1"));
        assert_eq!(parsed.retry_after_secs, Some(3));
    }

    #[test]
    fn parse_dps_response_rejects_other_topics() {
        assert!(parse_dps_response("$iothub/methods/POST/start/?$rid=1").is_none());
        assert!(parse_dps_response("$dps/registrations/res/abc/?$rid=1").is_none());
    }

    #[test]
    fn percent_encoding_roundtrip() {
        let raw = "a b/c=d&e";
        let encoded = percent_encode(raw);
        assert_eq!(encoded, "a%20b%2Fc%3Dd%26e");
        assert_eq!(percent_decode(&encoded), raw);
    }

    #[test]
    fn percent_decode_keeps_malformed_escape() {
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }
}

//! Connection bootstrapper: config → open hub connection, or a fatal error.
//!
//! A configured connection string is used directly (shared key, pre-signed
//! SAS or `x509=true`). Without one, the device registers through the
//! provisioning service and connects to the hub it is assigned. Every
//! failure here is terminal for the process; nothing is retried.

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use rumqttc::EventLoop;

use blinky_mqtt_channel::{
    HubClient, MqttChannel, MqttConfig, ProvisioningConfig, Provisioner, wait_connected,
};
use blinky_protocol::connection_string::{ConnectionString, Credential};
use blinky_protocol::{sas, topics};

use crate::config::AgentConfig;

/// Provisioning request built from the agent config, if one is configured.
pub fn provisioning_config(config: &AgentConfig) -> Option<ProvisioningConfig> {
    config.provisioning.as_ref().map(|p| ProvisioningConfig {
        host: p.host.clone(),
        port: p.port,
        id_scope: p.id_scope.clone(),
        registration_id: p.registration_id.clone(),
        ca_cert_path: config.ca_cert_path.clone(),
        client_cert_path: config.cert_path.clone(),
        client_key_path: config.key_path.clone(),
    })
}

/// Determine the hub connection string.
///
/// `make_provisioner` is only invoked when the config has no connection
/// string and asks for provisioning.
pub async fn resolve_connection_string<P, F>(
    config: &AgentConfig,
    make_provisioner: F,
) -> anyhow::Result<ConnectionString>
where
    P: Provisioner,
    F: FnOnce(ProvisioningConfig) -> P,
{
    if let Some(raw) = &config.connection_string {
        return ConnectionString::parse(raw).context("invalid connection string");
    }

    let Some(provisioning) = provisioning_config(config) else {
        anyhow::bail!("no connection string and no provisioning settings");
    };
    let registration_id = provisioning.registration_id.clone();

    let registration = make_provisioner(provisioning)
        .register()
        .await
        .with_context(|| format!("provisioning registration '{registration_id}' failed"))?;

    tracing::info!(
        assigned_hub = %registration.assigned_hub,
        device_id = %registration.device_id,
        "device provisioned"
    );
    Ok(registration.connection_string())
}

/// MQTT settings for `connection`.
///
/// Certificate paths are set only for X.509 identities; shared keys are
/// signed into a SAS token valid from `now`.
pub fn mqtt_config(
    config: &AgentConfig,
    connection: &ConnectionString,
    now: DateTime<Utc>,
) -> anyhow::Result<MqttConfig> {
    let password = match &connection.credential {
        Credential::SharedAccessKey(key) => Some(
            sas::device_token(
                &connection.host_name,
                &connection.device_id,
                key,
                now,
                config.sas_token_ttl_secs,
            )
            .context("failed to sign SAS token")?,
        ),
        Credential::SharedAccessSignature(token) => Some(token.clone()),
        Credential::X509 => None,
    };

    let (client_cert_path, client_key_path) = if connection.uses_x509() {
        (Some(config.cert_path.clone()), Some(config.key_path.clone()))
    } else {
        (None, None)
    };

    Ok(MqttConfig {
        broker_host: connection.broker_host().to_string(),
        broker_port: config.broker_port,
        client_id: connection.device_id.clone(),
        username: topics::hub_username(&connection.host_name, &connection.device_id),
        password,
        use_tls: config.use_tls,
        ca_cert_path: config.ca_cert_path.clone(),
        client_cert_path,
        client_key_path,
        keepalive_secs: config.keepalive_secs,
    })
}

/// Open the hub connection, subscribe to methods and cloud-to-device
/// messages, and wait for the broker to accept the connection.
pub async fn open_hub(
    mqtt: &MqttConfig,
    device_id: &str,
) -> anyhow::Result<(HubClient<MqttChannel>, EventLoop)> {
    let (channel, mut eventloop) = MqttChannel::new(mqtt).context("failed to build MQTT client")?;
    if mqtt.uses_client_cert() {
        tracing::info!("using X.509 client certificate authentication");
    }

    let hub = HubClient::new(channel, device_id);
    hub.subscribe_methods().await?;
    hub.subscribe_cloud_to_device().await?;

    wait_connected(&mut eventloop)
        .await
        .context("connect error")?;
    tracing::info!(host = %mqtt.broker_host, device_id, "connected to hub");

    Ok((hub, eventloop))
}

//! Offline signing and authenticated API calls.

use std::io::{Write, stdout};

use anyhow::Context;
use clap::Args;
use hyperlinker::{
    KeyPair, Signature,
    eip712::TypedData,
    hypercore::HttpClient,
    signing::{AuthMessage, sign_verified},
};
use url::Url;

use crate::args::{load_key, read_json_arg, spinner};

/// Signs `MESSAGE` with the EIP-191 prefix.
#[derive(Args)]
pub struct SignMessageCmd {
    /// Private key (prompted when missing).
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,
    /// Message to sign.
    #[arg(long, env = "MESSAGE")]
    message: String,
}

impl SignMessageCmd {
    pub fn run(self) -> anyhow::Result<()> {
        let key = load_key(self.private_key.as_deref(), "signer")?;
        let message = AuthMessage::Personal(self.message);
        let digest = message.digest()?;
        let signature = sign_verified(&key, &digest)?;
        print_signature(&key, &digest.to_string(), &signature)
    }
}

/// Signs an EIP-712 document given inline or as `@path`.
#[derive(Args)]
pub struct SignTypedDataCmd {
    /// Private key (prompted when missing).
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,
    /// Typed-data JSON, or `@file.json`.
    #[arg(long, env = "TYPED_DATA")]
    typed_data: String,
}

impl SignTypedDataCmd {
    pub fn run(self) -> anyhow::Result<()> {
        let doc = TypedData::from_json_str(&read_json_arg(&self.typed_data)?)?;
        let key = load_key(self.private_key.as_deref(), "signer")?;
        let digest = doc.signing_hash()?;
        let signature = sign_verified(&key, &digest)?;
        print_signature(&key, &digest.to_string(), &signature)
    }
}

/// POSTs `PAYLOAD` to `API_URL`, authenticated by a signature over either
/// `TYPED_DATA` or `MESSAGE`.
#[derive(Args)]
pub struct ApiCallCmd {
    /// Private key (prompted when missing).
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,
    /// Endpoint to call.
    #[arg(long, env = "API_URL")]
    api_url: Url,
    /// JSON body, or `@file.json`.
    #[arg(long, env = "PAYLOAD")]
    payload: String,
    /// Personal message to sign.
    #[arg(long, env = "MESSAGE", conflicts_with = "typed_data")]
    message: Option<String>,
    /// Typed-data document to sign, or `@file.json`.
    #[arg(long, env = "TYPED_DATA")]
    typed_data: Option<String>,
}

impl ApiCallCmd {
    pub async fn run(self) -> anyhow::Result<()> {
        let payload: serde_json::Value = serde_json::from_str(&read_json_arg(&self.payload)?)
            .context("PAYLOAD is not valid JSON")?;
        let message = match (self.typed_data, self.message) {
            (Some(doc), _) => AuthMessage::TypedData(Box::new(TypedData::from_json_str(
                &read_json_arg(&doc)?,
            )?)),
            (None, Some(message)) => AuthMessage::Personal(message),
            (None, None) => anyhow::bail!("either MESSAGE or TYPED_DATA must be given"),
        };
        let key = load_key(self.private_key.as_deref(), "signer")?;

        let client = HttpClient::with_url(self.api_url.clone())?;
        let pb = spinner(format!("calling {}", self.api_url));
        let body = client
            .authenticated_post(self.api_url, &key, &message, &payload)
            .await;
        pb.finish_and_clear();

        println!("{}", body?);
        Ok(())
    }
}

fn print_signature(key: &KeyPair, digest: &str, signature: &Signature) -> anyhow::Result<()> {
    let mut writer = tabwriter::TabWriter::new(stdout());
    writeln!(&mut writer, "address\t{}", key.address())?;
    writeln!(&mut writer, "digest\t{digest}")?;
    writeln!(&mut writer, "signature\t{signature}")?;
    writeln!(&mut writer, "r\t{:#x}", signature.r)?;
    writeln!(&mut writer, "s\t{:#x}", signature.s)?;
    writeln!(&mut writer, "v\t{}", signature.v)?;
    writer.flush()?;
    Ok(())
}

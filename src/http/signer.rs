use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::error::FetchError;

type HmacSha256 = Hmac<Sha256>;

/// Binance `X-MBX-APIKEY` + HMAC-SHA256 request signing.
#[derive(Clone)]
pub struct BinanceSigner {
    api_key: Zeroizing<String>,
    api_secret: Zeroizing<String>,
}

impl std::fmt::Debug for BinanceSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceSigner").finish_non_exhaustive()
    }
}

impl BinanceSigner {
    pub fn new(api_key: Zeroizing<String>, api_secret: Zeroizing<String>) -> Self {
        Self { api_key, api_secret }
    }

    pub fn api_key(&self) -> &str {
        self.api_key.as_str()
    }

    /// Hex HMAC-SHA256 of the already-encoded query string.
    pub fn sign(&self, query: &str) -> Result<String, FetchError> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| FetchError::Signing(e.to_string()))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_matches_binance_reference() {
        let signer = BinanceSigner::new(
            Zeroizing::new("vmPUZE6mv9SD5VNHk4HlWFsOr6aKE2zvsw0MuIgwCIPy6utIco14y7Ju91duEh8A".into()),
            Zeroizing::new("NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j".into()),
        );
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";

        assert_eq!(
            signer.sign(query).unwrap(),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_debug_hides_secrets() {
        let signer = BinanceSigner::new(Zeroizing::new("key".into()), Zeroizing::new("secret".into()));
        let rendered = format!("{:?}", signer);
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("key\""));
    }
}

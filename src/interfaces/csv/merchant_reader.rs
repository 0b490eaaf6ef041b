use crate::domain::merchant::Merchant;
use crate::error::{PaymentError, Result};
use std::io::Read;

/// Reads merchant registrations from a CSV source.
///
/// Expects the header `id,name,domain,api_key,active`. Whitespace is trimmed
/// and domains are normalized to lowercase so they compare the same way as
/// merchants created through [`Merchant::new`].
pub struct MerchantReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> MerchantReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes one merchant per row.
    pub fn merchants(self) -> impl Iterator<Item = Result<Merchant>> {
        self.reader.into_deserialize().map(|result| {
            result
                .map(|mut merchant: Merchant| {
                    merchant.domain = merchant.domain.to_ascii_lowercase();
                    merchant
                })
                .map_err(PaymentError::from)
        })
    }
}

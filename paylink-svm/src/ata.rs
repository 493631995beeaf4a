//! Associated token account derivation.
//!
//! Token payments do not touch the recipient's main address, they land in the
//! account derived from `(owner, token program, mint)` under the associated
//! token account program. That address is computed here rather than looked up.

use solana_pubkey::Pubkey;

use crate::chain::Address;
use crate::networks::{ATA_PROGRAM, TokenProgram};

/// Derives the associated token account of `owner` for `mint`.
#[must_use]
pub fn associated_token_address(owner: &Address, mint: &Address, program: TokenProgram) -> Address {
    let token_program = program.id();
    let (ata, _bump) = Pubkey::find_program_address(
        &[
            owner.pubkey().as_ref(),
            token_program.as_ref(),
            mint.pubkey().as_ref(),
        ],
        &ATA_PROGRAM,
    );
    Address::new(ata)
}

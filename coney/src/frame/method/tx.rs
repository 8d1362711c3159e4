//! Tx class (id 90).

use serde::{Deserialize, Serialize};

use super::impl_method;

impl_method!(TxSelect, 90, 10);
impl_method!(TxSelectOk, 90, 11);
impl_method!(TxCommit, 90, 20);
impl_method!(TxCommitOk, 90, 21);
impl_method!(TxRollback, 90, 30);
impl_method!(TxRollbackOk, 90, 31);

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct TxSelect;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct TxSelectOk;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct TxCommit;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct TxCommitOk;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct TxRollback;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct TxRollbackOk;

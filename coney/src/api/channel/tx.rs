//! Tx-class operations (server-local transactions).

use crate::api::error::Result;
use crate::api::synchronous_request;
use crate::frame::{Frame, TxCommit, TxRollback, TxSelect};

use super::Channel;

impl Channel {
    /// Put the channel into transactional mode.
    ///
    /// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#tx.select).
    pub async fn tx_select(&self) -> Result<()> {
        synchronous_request!(self, vec![TxSelect.into_frame()], Frame::TxSelectOk)?;
        Ok(())
    }

    /// Commit the current transaction.
    pub async fn tx_commit(&self) -> Result<()> {
        synchronous_request!(self, vec![TxCommit.into_frame()], Frame::TxCommitOk)?;
        Ok(())
    }

    /// Abandon the current transaction.
    pub async fn tx_rollback(&self) -> Result<()> {
        synchronous_request!(self, vec![TxRollback.into_frame()], Frame::TxRollbackOk)?;
        Ok(())
    }
}

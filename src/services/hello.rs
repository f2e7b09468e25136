use std::convert::Infallible;

use crate::rpc::registry::{MethodTable, RpcService};

/// Greets whoever calls `HelloService.Hello`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HelloService;

impl HelloService {
    pub fn hello(&self, request: String, reply: &mut String) -> Result<(), Infallible> {
        *reply = format!("Hello {request}");
        Ok(())
    }
}

impl RpcService for HelloService {
    fn methods(table: &mut MethodTable<Self>) {
        table.method("Hello", Self::hello);
    }
}

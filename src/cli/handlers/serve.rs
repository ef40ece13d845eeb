use std::net::SocketAddr;
use std::sync::Arc;

use crate::init::AppContext;

pub async fn handle_serve(ctx: AppContext, bind: Option<SocketAddr>) -> anyhow::Result<()> {
    let addr = bind.unwrap_or(ctx.config.bind);
    crate::api::serve(Arc::new(ctx), addr).await
}

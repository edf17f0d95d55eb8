// 操作审计
// 处理器在业务成功之后调用，写入在后台进行，失败只记日志

use std::sync::Arc;

use crate::database::AuditLogStore;
use crate::models::AuditEntry;

pub fn emit(sink: &Arc<dyn AuditLogStore>, entry: AuditEntry) {
    let sink = Arc::clone(sink);
    tokio::spawn(async move {
        let action = entry.action;
        if let Err(e) = sink.append(entry).await {
            tracing::warn!(action, "Failed to write audit log: {}", e);
        }
    });
}

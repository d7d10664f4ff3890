// ==========================================
// 集成测试辅助工具
// ==========================================
// 职责: 批次/需求构造的通用辅助函数
// ==========================================

#![allow(dead_code)]

use blend_optimizer::{LotBuilder, LotRecord, Requirements};

/// 创建测试批次（绒朵 + 可用量）
pub fn lot(article_code: &str, lot_code: &str, dc: f64, available: f64) -> LotRecord {
    LotBuilder::new(article_code, lot_code)
        .down_cluster(dc)
        .available(available)
        .build()
}

/// 创建带成本与杂质的测试批次
pub fn priced_lot(
    article_code: &str,
    lot_code: &str,
    dc: f64,
    oe: f64,
    available: f64,
    cost: f64,
) -> LotRecord {
    LotBuilder::new(article_code, lot_code)
        .down_cluster(dc)
        .other_elements(oe)
        .available(available)
        .cost(cost)
        .build()
}

/// 白鹅绒库存: 绒朵在目标附近交错分布
pub fn white_goose_inventory(count: usize) -> Vec<LotRecord> {
    (0..count)
        .map(|i| {
            let offset = (i as f64 % 7.0) - 3.0;
            priced_lot(
                "3|POB",
                &format!("WG{:03}", i),
                80.0 + offset,
                1.0 + (i % 3) as f64 * 0.5,
                300.0 + (i % 4) as f64 * 150.0,
                40.0 + (i % 5) as f64,
            )
        })
        .collect()
}

/// 创建需求（目标绒朵 + 总量 + 方案数 + 批次上限）
pub fn requirements(
    target_dc: f64,
    total_qty: f64,
    num_solutions: usize,
    max_lots: usize,
) -> Requirements {
    let mut req = Requirements::new(target_dc, total_qty);
    req.num_solutions = num_solutions;
    req.max_lots = max_lots;
    req
}

//! 并发场景集成测试
//!
//! 多个线程共享同一个引擎时，token 唯一性和验证次数上限都必须成立。

use otprs::otp::{OtpConfig, OtpEngine};
use otprs::Error;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const TTL: Duration = Duration::from_secs(60);

/// 并发签发不会分配到相同的 token
#[test]
fn test_concurrent_issuance_yields_unique_tokens() {
    // 3 字符 token 只有 46656 种，足以让候选冲突频繁发生
    let engine = Arc::new(OtpEngine::new(OtpConfig::new(6, 3)).unwrap());
    let threads = 8;
    let per_thread = 250;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..per_thread)
                    .map(|_| engine.new_code(TTL, 1).unwrap().token)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut tokens = HashSet::new();
    for handle in handles {
        for token in handle.join().unwrap() {
            assert!(tokens.insert(token), "duplicate token issued");
        }
    }

    assert_eq!(tokens.len(), threads * per_thread);
    assert_eq!(engine.len().unwrap(), threads * per_thread);
}

/// 并发提交正确验证码时，成功次数不会超过上限
#[test]
fn test_concurrent_validation_respects_cap() {
    let engine = Arc::new(OtpEngine::new(OtpConfig::standard()).unwrap());

    for max_attempts in [1u32, 3, 5] {
        let issued = engine.new_code(TTL, max_attempts).unwrap();
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let barrier = Arc::clone(&barrier);
                let token = issued.token.clone();
                let code = issued.code.clone();
                thread::spawn(move || {
                    barrier.wait();
                    engine.validate(&token, &code)
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(true) => successes += 1,
                Ok(false) => panic!("correct code reported as mismatch"),
                Err(Error::AttemptsExceeded) | Err(Error::NotFound) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(successes, max_attempts);
    }
}

/// 并发使用同一个指定 token 签发时，只有一个调用成功
#[test]
fn test_concurrent_assigned_token_single_winner() {
    let engine = Arc::new(OtpEngine::new(OtpConfig::standard()).unwrap());
    let threads = 12;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.new_code_with_assigned_token("shared-session", TTL, 1)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    let collisions = results
        .iter()
        .filter(|r| matches!(r, Err(Error::AlreadyExists)))
        .count();

    assert_eq!(winners, 1);
    assert_eq!(collisions, threads - 1);
}

/// 清理与验证并发执行时不会出现意外错误
#[test]
fn test_collect_alongside_validation() {
    let engine = Arc::new(OtpEngine::new(OtpConfig::standard()).unwrap());
    let issued: Vec<_> = (0..200).map(|_| engine.new_code(TTL, 1).unwrap()).collect();

    let sweeper = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for _ in 0..20 {
                let report = engine.collect().unwrap();
                assert!(report.is_clean());
            }
        })
    };

    for otp in &issued {
        assert!(engine.validate(&otp.token, &otp.code).unwrap());
    }
    sweeper.join().unwrap();

    // 所有记录都已用完，最后一次清理后存储为空
    engine.collect().unwrap();
    assert!(engine.is_empty().unwrap());
}

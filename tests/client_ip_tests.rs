//! Client IP resolution through real requests

use actix_web::test::TestRequest;

use geoip_api::utils::extract_client_ip;

#[test]
fn test_forwarded_for_beats_real_ip() {
    let req = TestRequest::default()
        .insert_header(("X-Forwarded-For", "1.2.3.4, 5.6.7.8"))
        .insert_header(("X-Real-IP", "9.9.9.9"))
        .peer_addr("10.0.0.1:8080".parse().unwrap())
        .to_http_request();
    assert_eq!(extract_client_ip(&req), "1.2.3.4");
}

#[test]
fn test_remote_address_without_headers() {
    let req = TestRequest::default()
        .peer_addr("203.0.113.9:443".parse().unwrap())
        .to_http_request();
    assert_eq!(extract_client_ip(&req), "203.0.113.9");
}

#[test]
fn test_header_priority_chain() {
    let cases: [(&[(&str, &str)], &str); 4] = [
        (&[("X-Real-IP", " 198.51.100.1 "), ("CF-Connecting-IP", "192.0.2.1")], "198.51.100.1"),
        (&[("CF-Connecting-IP", "192.0.2.1"), ("X-Originating-IP", "192.0.2.2")], "192.0.2.1"),
        (&[("X-Originating-IP", "192.0.2.2")], "192.0.2.2"),
        (&[("X-Forwarded-For", "2001:db8::7")], "2001:db8::7"),
    ];

    for (headers, expected) in cases {
        let mut req = TestRequest::default().peer_addr("10.0.0.1:8080".parse().unwrap());
        for &(name, value) in headers {
            req = req.insert_header((name, value));
        }
        assert_eq!(extract_client_ip(&req.to_http_request()), expected);
    }
}

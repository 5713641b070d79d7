// 点赞接口不需要请求体，路径参数携带帖子ID
// 响应复用服务层的 LikeOutcome
